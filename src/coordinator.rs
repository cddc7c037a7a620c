use crate::config::WatchConfig;
use crate::host::{Callback, ObservationHost, Subscription};
use crate::observer::ChangeObserver;

/// Price and quantity subscriptions wired to one change signal.
///
/// Dropping it, or calling [`Observers::cancel`], stops both.
#[derive(Debug, Default)]
#[must_use = "dropping Observers stops observing immediately"]
pub struct Observers {
    price: Option<Subscription>,
    quantity: Option<Subscription>,
}

/// Observes whichever selectors are given and funnels every detected change
/// into `callback`.
///
/// An omitted (or empty) selector attaches nothing and logs nothing; a
/// selector that matches no element is warned about by the observer and
/// skipped.
pub fn setup_observers<H: ObservationHost>(
    observer: &ChangeObserver<H>,
    price_selector: Option<&str>,
    quantity_selector: Option<&str>,
    callback: Callback,
) -> Observers {
    let price = price_selector
        .filter(|selector| !selector.is_empty())
        .and_then(|selector| observer.setup_price_observer(selector, callback.clone()));
    let quantity = quantity_selector
        .filter(|selector| !selector.is_empty())
        .and_then(|selector| observer.setup_quantity_observer(selector, callback));
    Observers { price, quantity }
}

impl Observers {
    pub fn from_config<H: ObservationHost>(
        observer: &ChangeObserver<H>,
        config: &WatchConfig,
        callback: Callback,
    ) -> Self {
        setup_observers(observer, config.price(), config.quantity(), callback)
    }

    pub fn price(&self) -> Option<&Subscription> {
        self.price.as_ref()
    }

    pub fn quantity(&self) -> Option<&Subscription> {
        self.quantity.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.quantity.is_none()
    }

    pub fn hook_count(&self) -> usize {
        self.price
            .iter()
            .chain(self.quantity.iter())
            .map(Subscription::hook_count)
            .sum()
    }

    pub fn cancel(self) {
        if let Some(price) = self.price {
            price.cancel();
        }
        if let Some(quantity) = self.quantity {
            quantity.cancel();
        }
    }
}
