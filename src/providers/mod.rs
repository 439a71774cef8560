pub mod api_provider;
pub mod util;

pub use api_provider::ApiRateProvider;
