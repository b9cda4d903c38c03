pub mod currency;
pub mod quote;
pub mod record;
pub mod request_params;
pub mod window;
