//! Daemon module - main event loop orchestration
//!
//! Loads and validates the sound catalog, opens the audio output, starts
//! the key listener and feeds its events to the dispatcher until shutdown.

use crate::audio::{source, AudioOutput, Player, SoundCatalog};
use crate::config::Config;
use crate::dispatch::{Dispatcher, KeyEvent};
use crate::error::{InputError, KeyclackError, Result};
use crate::input;
use crate::keymap::KeyMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Load the configured sound pack into a catalog
pub fn load_catalog(config: &Config) -> Result<SoundCatalog> {
    let pack = source::open_pack(&config.sounds.pack, config.output.sample_rate)?;
    Ok(SoundCatalog::load_all(pack.as_ref())?)
}

/// Feed events to the dispatcher until the channel closes
///
/// Returns the first dispatch error, which ends the loop.
pub async fn pump_events<P: Player>(
    dispatcher: &mut Dispatcher<P>,
    rx: &mut mpsc::Receiver<KeyEvent>,
) -> Result<()> {
    while let Some(event) = rx.recv().await {
        dispatcher.handle(event)?;
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        KeyclackError::Config(format!("Failed to set up SIGTERM handler: {}", e))
    })?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down...");
    Ok(())
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until shutdown or a fatal error
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting keyclack daemon");
        self.config.validate()?;

        let catalog = Arc::new(load_catalog(&self.config)?);

        let mut listener = input::create_listener(self.config.input.backend)?;
        let layout = listener.layout();
        let keymap = KeyMap::builtin(layout);

        // Every sound the table can ask for must exist before the first key press
        catalog.validate(&keymap)?;
        tracing::info!(
            "Key table: {} ({} keys, {} sounds)",
            layout,
            keymap.len(),
            keymap.sound_names().len()
        );

        let output = AudioOutput::open(&self.config.output, catalog)?;
        let policy = self.config.input.unmapped_key;
        tracing::info!("Unmapped keys: {:?}", policy);

        let mut dispatcher = Dispatcher::new(Arc::new(keymap), output.queue(), policy);
        let mut rx = listener.start().await?;

        let result = tokio::select! {
            result = pump_events(&mut dispatcher, &mut rx) => result.and_then(|()| {
                Err(KeyclackError::Input(InputError::Listen(
                    "key listener stopped unexpectedly".to_string(),
                )))
            }),
            result = shutdown_signal() => result,
        };

        // Cleanup
        listener.stop().await?;
        tracing::info!("Daemon stopped");

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnmappedKeyPolicy;
    use crate::error::{DispatchError, PlaybackError};
    use crate::keymap::KeyId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SharedRecorder {
        calls: Mutex<Vec<String>>,
    }

    impl Player for SharedRecorder {
        fn play(&self, name: &str) -> std::result::Result<(), PlaybackError> {
            self.calls.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_pump_events_until_channel_closes() {
        let keymap = Arc::new(KeyMap::new([(0, "a")]));
        let mut dispatcher =
            Dispatcher::new(keymap, SharedRecorder::default(), UnmappedKeyPolicy::Fatal);
        let (tx, mut rx) = mpsc::channel(8);

        tx.send(KeyEvent::hold(KeyId(0))).await.unwrap();
        tx.send(KeyEvent::hold(KeyId(0))).await.unwrap();
        tx.send(KeyEvent::release(KeyId(0))).await.unwrap();
        drop(tx);

        pump_events(&mut dispatcher, &mut rx).await.unwrap();
        assert_eq!(*dispatcher.player().calls.lock().unwrap(), vec!["a", "release"]);
    }

    #[tokio::test]
    async fn test_pump_events_stops_on_fatal_key() {
        let keymap = Arc::new(KeyMap::new([(0, "a")]));
        let mut dispatcher =
            Dispatcher::new(keymap, SharedRecorder::default(), UnmappedKeyPolicy::Fatal);
        let (tx, mut rx) = mpsc::channel(8);

        tx.send(KeyEvent::hold(KeyId(5))).await.unwrap();
        tx.send(KeyEvent::hold(KeyId(0))).await.unwrap();

        let err = pump_events(&mut dispatcher, &mut rx).await.unwrap_err();
        assert!(matches!(
            err,
            KeyclackError::Dispatch(DispatchError::UnmappedKey(KeyId(5)))
        ));
        assert!(dispatcher.player().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_builtin_catalog() {
        let catalog = load_catalog(&Config::default()).unwrap();
        assert!(catalog.contains("release"));
        assert!(catalog.contains("space"));
    }

    #[test]
    fn test_load_missing_pack_dir() {
        let mut config = Config::default();
        config.sounds.pack = "/nonexistent/keyclack-pack".to_string();
        assert!(matches!(load_catalog(&config), Err(KeyclackError::Load(_))));
    }
}
