use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "CHATBRIDGE_DISABLE_SYSTEM_PROXY";

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    let builder = Client::builder().timeout(timeout);
    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };
    builder.build().expect("Failed to build reqwest client")
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
