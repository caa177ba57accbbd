use std::time::Duration;

use reqwest::{Client, Error};

pub struct HttpClient;

impl HttpClient {
    pub fn user_agent() -> String {
        format!("tunedeck/{}", env!("CARGO_PKG_VERSION"))
    }

    /// REST client for the audio node. Requests that hang past the timeout
    /// surface as external failures to the caller.
    pub fn new() -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(10))
            .build()
    }
}
