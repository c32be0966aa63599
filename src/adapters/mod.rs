// Adapters layer: concrete implementations of the browser and webhook ports.

pub mod webdriver;
pub mod webhook;

pub use webdriver::WebDriverBrowser;
pub use webhook::HttpWebhookClient;
