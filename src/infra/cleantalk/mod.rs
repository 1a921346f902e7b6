pub mod cleantalk_client;

pub use cleantalk_client::CleanTalkClient;
