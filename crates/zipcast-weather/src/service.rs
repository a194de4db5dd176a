//! Background forecast requests.
//! Network work runs on the Tokio runtime; results come back via mpsc so the
//! caller can present them from whatever thread owns the output.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::cache::ForecastCache;
use crate::types::{Forecast, ForecastError};

/// Messages sent from async operations back to the caller
#[derive(Debug)]
pub enum ForecastMessage {
    /// Result of looking up the forecast for `zip`
    FetchDone {
        zip: String,
        result: Result<Forecast, ForecastError>,
    },
}

/// Request the forecast for `zip` without blocking the calling thread.
///
/// Sends `FetchDone` on the channel when complete. Requests are not
/// cancelled by newer ones; each runs until it succeeds, fails or times out.
pub fn request_fetch(
    tx: &Sender<ForecastMessage>,
    runtime: &Handle,
    cache: Arc<ForecastCache>,
    zip: impl Into<String>,
) -> JoinHandle<()> {
    let tx = tx.clone();
    let zip = zip.into();

    runtime.spawn(async move {
        let result = cache.get_forecast(&zip).await;
        if let Err(e) = &result {
            tracing::error!("Unable to load forecast for {}: {}", zip, e);
        }
        if tx.send(ForecastMessage::FetchDone { zip, result }).is_err() {
            tracing::debug!("Forecast receiver dropped before delivery");
        }
    })
}
