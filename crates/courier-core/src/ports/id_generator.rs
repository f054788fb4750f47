//! IdGenerator port. Keys are ULIDs.

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ids::{AddressId, DeliveryId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    /// Raw key for a new document.
    fn generate(&self) -> Ulid;

    fn generate_delivery_id(&self) -> DeliveryId {
        DeliveryId::from(self.generate())
    }

    fn generate_address_id(&self) -> AddressId {
        AddressId::from(self.generate())
    }
}

/// ULID generator whose timestamp part comes from a `Clock`.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl IdGenerator for UlidGenerator {
    fn generate(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.generate_delivery_id();
        let id2 = id_gen.generate_delivery_id();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("delivery-"));
        assert!(id_gen.generate_address_id().to_string().starts_with("address-"));
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(Arc::new(FixedClock::new(fixed_time)));

        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        // random part differs, timestamp part does not
        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), id2.timestamp_ms());
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
