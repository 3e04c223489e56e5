use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::core::PriceLineOptions;
use crate::engine::{PriceLineHandle, SeriesHandle};
use crate::error::{BindingResult, swallow_double_removal};

use super::scope::refresh_on_publish;
use super::{ScopeConsumer, ScopeWatch, SeriesScope};

struct OwnedPriceLine {
    series: SeriesHandle,
    line: PriceLineHandle,
}

struct PriceLineState {
    series_scope: ScopeConsumer<SeriesScope>,
    options: PriceLineOptions,
    owned: Option<OwnedPriceLine>,
}

/// Binds one horizontal price line to the nearest series.
///
/// Options are re-applied on every update, changed or not. The line follows
/// the series scope: it is created once a series is published and removed
/// when the series goes away.
pub struct PriceLineBinding {
    state: Rc<RefCell<PriceLineState>>,
    series_watch: Option<ScopeWatch>,
}

impl PriceLineBinding {
    pub fn mount(
        series_scope: ScopeConsumer<SeriesScope>,
        options: PriceLineOptions,
    ) -> BindingResult<Self> {
        let state = Rc::new(RefCell::new(PriceLineState {
            series_scope: series_scope.clone(),
            options,
            owned: None,
        }));
        let series_watch = refresh_on_publish(
            &series_scope,
            &state,
            "price-line",
            PriceLineState::reconcile,
        );
        state.borrow_mut().reconcile()?;
        Ok(Self {
            state,
            series_watch: Some(series_watch),
        })
    }

    #[must_use]
    pub fn price_line(&self) -> Option<PriceLineHandle> {
        self.state
            .borrow()
            .owned
            .as_ref()
            .map(|owned| Rc::clone(&owned.line))
    }

    pub fn update(&mut self, options: PriceLineOptions) -> BindingResult<()> {
        let mut state = self.state.borrow_mut();
        state.options = options;
        state.refresh()
    }

    pub fn refresh(&mut self) -> BindingResult<()> {
        self.state.borrow_mut().refresh()
    }

    pub fn unmount(&mut self) -> BindingResult<()> {
        drop(self.series_watch.take());
        self.state.borrow_mut().teardown()
    }
}

impl PriceLineState {
    /// Follows the series scope without re-applying options to a kept line.
    fn reconcile(&mut self) -> BindingResult<()> {
        self.sync(false)
    }

    fn refresh(&mut self) -> BindingResult<()> {
        self.sync(true)
    }

    fn sync(&mut self, apply_options: bool) -> BindingResult<()> {
        let series = self.series_scope.with(|scope| scope.series.clone());

        let stale = self.owned.as_ref().is_some_and(|owned| {
            series.as_ref().is_none_or(|series| {
                !std::ptr::addr_eq(Rc::as_ptr(series), Rc::as_ptr(&owned.series))
            })
        });
        if stale {
            self.teardown()?;
        }

        let Some(series) = series else {
            return Ok(());
        };
        match &self.owned {
            Some(owned) => {
                if apply_options {
                    trace!(line = owned.line.id(), "applying price line options");
                    owned.line.apply_options(&self.options);
                }
            }
            None => {
                let line = match series.create_price_line(&self.options) {
                    Ok(line) => line,
                    Err(err) if err.is_not_ready() => {
                        debug!(series = series.id().raw(), "series not ready, price line deferred");
                        return Ok(());
                    }
                    Err(err) => return Err(err),
                };
                debug!(
                    series = series.id().raw(),
                    line = line.id(),
                    "created price line"
                );
                self.owned = Some(OwnedPriceLine { series, line });
            }
        }
        Ok(())
    }

    fn teardown(&mut self) -> BindingResult<()> {
        let Some(owned) = self.owned.take() else {
            return Ok(());
        };
        debug!(line = owned.line.id(), "removing price line");
        swallow_double_removal(owned.series.remove_price_line(&owned.line))
    }
}

impl Drop for PriceLineState {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(error = %err, "price line removal failed during drop");
        }
    }
}
