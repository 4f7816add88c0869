//! Font databases for text capture.
//!
//! The bundled set is the font data egui already ships, so layout never
//! depends on what the host has installed. The system set adds installed
//! fonts and is loaded once, off the calling thread.

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, Either, FutureExt, Shared};
use futures_timer::Delay;
use log::{debug, info};
use std::future::Future;
use std::pin::pin;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use usvg::fontdb::Database;

use crate::error::RasterError;

pub(crate) const SANS_FAMILY: &str = "Ubuntu";
pub(crate) const MONO_FAMILY: &str = "Hack";

/// Advance of one monospace glyph, in em
pub(crate) const MONO_ADVANCE_EM: f32 = 0.602;

type FontsFuture = Shared<BoxFuture<'static, Result<Arc<Database>, RasterError>>>;

static BUNDLED: OnceLock<Arc<Database>> = OnceLock::new();
static SYSTEM: OnceLock<FontsFuture> = OnceLock::new();

fn load_bundled() -> Database {
    let mut db = Database::new();
    for data in egui::FontDefinitions::default().font_data.values() {
        db.load_font_data(data.font.to_vec());
    }
    db.set_sans_serif_family(SANS_FAMILY);
    db.set_serif_family(SANS_FAMILY);
    db.set_monospace_family(MONO_FAMILY);
    db
}

/// Fonts embedded in the binary
pub fn bundled_fonts() -> Arc<Database> {
    Arc::clone(BUNDLED.get_or_init(|| {
        let db = load_bundled();
        debug!("Bundled font database ready ({} faces)", db.len());
        Arc::new(db)
    }))
}

/// Bundled plus installed fonts. Every caller awaits the same load.
pub fn system_fonts() -> FontsFuture {
    SYSTEM
        .get_or_init(|| {
            let (tx, rx) = oneshot::channel();
            let spawned = thread::Builder::new()
                .name("font-loader".into())
                .spawn(move || {
                    let mut db = load_bundled();
                    db.load_system_fonts();
                    info!("System font database ready ({} faces)", db.len());
                    let _ = tx.send(Arc::new(db));
                });

            match spawned {
                Ok(_) => rx
                    .map(|result| {
                        result.map_err(|_| RasterError::Fonts("font loader exited early".into()))
                    })
                    .boxed()
                    .shared(),
                Err(e) => future::ready(Err(RasterError::Fonts(e.to_string())))
                    .boxed()
                    .shared(),
            }
        })
        .clone()
}

/// System fonts, waiting at most `timeout` for the first load to finish
pub(crate) async fn settled_system_fonts(timeout: Duration) -> Result<Arc<Database>, RasterError> {
    let fonts = system_fonts();
    if let Some(loaded) = fonts.peek() {
        return loaded.clone();
    }
    settle(fonts, timeout).await
}

/// Wait for `work`, giving up after `timeout`
pub(crate) async fn settle<T>(
    work: impl Future<Output = Result<T, RasterError>>,
    timeout: Duration,
) -> Result<T, RasterError> {
    match future::select(pin!(work), Delay::new(timeout)).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(RasterError::SettleTimeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use usvg::fontdb::{Family, Query};

    #[test]
    fn test_bundled_has_mono_and_sans() {
        let db = bundled_fonts();
        for family in [Family::Name(MONO_FAMILY), Family::SansSerif] {
            let query = Query {
                families: &[family],
                ..Query::default()
            };
            assert!(db.query(&query).is_some());
        }
    }

    #[test]
    fn test_settle_times_out() {
        let result: Result<(), _> = block_on(settle(
            future::pending::<Result<(), RasterError>>(),
            Duration::from_millis(20),
        ));
        assert!(matches!(result, Err(RasterError::SettleTimeout(_))));
    }

    #[test]
    fn test_loaded_system_fonts_skip_the_timer() {
        let loaded = block_on(system_fonts()).unwrap();
        let settled = block_on(settled_system_fonts(Duration::ZERO)).unwrap();
        assert!(Arc::ptr_eq(&loaded, &settled));
    }

    #[test]
    fn test_settle_passes_result_through() {
        let result = block_on(settle(
            future::ready(Ok::<_, RasterError>(7)),
            Duration::from_secs(5),
        ));
        assert_eq!(result.unwrap(), 7);
    }
}
