pub mod connection;
pub mod cookies;
pub mod headless;
pub mod session;

pub use connection::connect_to_browser;
pub use cookies::{decode_cookies, SessionCookie};
pub use headless::{find_executable, launch_browser};
pub use session::{ChromeLauncher, ChromeSession};
