pub mod link;
pub mod packet;
pub mod record;
pub mod route;
