//! Administrative control surface.

use harness_core::Endpoints;

/// Client for the backend's admin surface.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    quit_url: String,
}

impl AdminClient {
    /// Create a client for the given endpoints.
    #[must_use]
    pub fn new(http: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            http,
            quit_url: endpoints.quit_url(),
        }
    }

    /// Ask the backend to shut itself down.
    ///
    /// Only a failure to deliver the request is an error; the backend's
    /// answer is not inspected.
    ///
    /// # Errors
    /// Returns error if the request cannot be sent.
    pub async fn quit(&self) -> Result<(), reqwest::Error> {
        tracing::debug!(url = %self.quit_url, "Requesting backend quit");
        let response = self.http.get(&self.quit_url).send().await?;
        tracing::debug!(status = %response.status(), "Backend acknowledged quit");
        Ok(())
    }
}
