//! Notification handling for the soil sensor
//! Subscribes to the configured notification characteristics and feeds
//! every payload through the frame decoder. Each characteristic gets its
//! own task consuming its stream; a shared cancellation token tears all of
//! them down on disconnect so a stale notification can never write into a
//! store that has already been reset.

use std::sync::{Arc, Mutex};

use bluest::Characteristic;
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use crate::core::frame::{FrameChannel, FrameDecoder};
use crate::core::store::ReadingSink;
use crate::error::BridgeError;

/// Notification handler for sensor data
#[derive(Clone)]
pub struct NotificationHandler {
    decoder: Arc<Mutex<FrameDecoder>>,
    sink: Arc<dyn ReadingSink>,
}

impl NotificationHandler {
    pub fn new(decoder: Arc<Mutex<FrameDecoder>>, sink: Arc<dyn ReadingSink>) -> Self {
        Self { decoder, sink }
    }

    /// Set up notifications for every subscribed characteristic. Returns
    /// immediately; the streams are drained by background tasks bound to
    /// `cancel_token`.
    pub async fn setup_notifications(
        &self,
        characteristics: Vec<(FrameChannel, Characteristic)>,
        cancel_token: CancellationToken,
    ) -> Result<(), BridgeError> {
        info!("Subscribing to notifications...");

        for (channel, characteristic) in characteristics {
            let decoder = self.decoder.clone();
            let sink = self.sink.clone();
            let token = cancel_token.clone();

            tokio::spawn(async move {
                Self::process_notifications(channel, characteristic, decoder, sink, token).await;
            });
        }

        Ok(())
    }

    /// Process notifications from one characteristic until the stream ends
    /// or the connection is torn down.
    async fn process_notifications(
        channel: FrameChannel,
        characteristic: Characteristic,
        decoder: Arc<Mutex<FrameDecoder>>,
        sink: Arc<dyn ReadingSink>,
        cancel_token: CancellationToken,
    ) {
        info!("Listening for {:?} sensor notifications...", channel);

        let mut notification_stream = match characteristic.notify().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to subscribe to {:?} notifications: {}", channel, e);
                return;
            }
        };

        loop {
            tokio::select! {
                result = notification_stream.next() => {
                    match result {
                        Some(Ok(value)) => {
                            debug!("Received {:?} sensor data: {:?}", channel, value);

                            // Decode errors are logged inside the decoder;
                            // the frame is dropped and the last good
                            // reading stands.
                            let reading = {
                                let mut decoder = decoder.lock().unwrap();
                                decoder.on_notification(channel, &value)
                            };

                            if let Some(reading) = reading {
                                debug!("Parsed sensor reading: {:?}", reading);
                                sink.publish(reading).await;
                            }
                        }
                        Some(Err(e)) => {
                            error!("Error in {:?} notification stream: {}", channel, e);
                            break;
                        }
                        None => break,
                    }
                }
                _ = cancel_token.cancelled() => {
                    debug!("{:?} notification task cancelled", channel);
                    break;
                }
            }
        }

        info!("{:?} notification stream ended", channel);
    }

    /// Clears any partial reassembly state. Called on disconnect.
    pub fn reset_decoder(&self) {
        self.decoder.lock().unwrap().reset();
    }
}
