//! 浏览器连接
//!
//! 两种获取页面的方式：连接已运行的浏览器（复用登录态），或自行启动。

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;
