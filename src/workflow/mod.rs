pub mod flows;
pub mod processors;
pub mod work_set;
