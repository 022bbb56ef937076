use rand::Rng;

/// Probabilistic single-byte corruption of outgoing datagrams.
///
/// Simulates transport corruption to exercise the NACK/retransmission path:
/// with the configured probability, one byte at a uniformly random position
/// is incremented. Applied only to freshly created data packets — never to
/// the token or to relayed traffic.
#[derive(Debug, Clone)]
pub struct ErrorInjector {
    probability: f64,
}

impl ErrorInjector {
    /// Creates an injector firing with the given probability per packet
    pub fn new(probability: f64) -> Self {
        ErrorInjector { probability }
    }

    /// An injector that never corrupts anything
    pub fn disabled() -> Self {
        ErrorInjector { probability: 0.0 }
    }

    /// Possibly corrupts one byte of `data` in place
    pub fn inject(&self, data: &mut [u8]) {
        if data.is_empty() {
            return;
        }
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < self.probability {
            let pos = rng.gen_range(0..data.len());
            data[pos] = data[pos].wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_probability_is_a_pass_through() {
        let injector = ErrorInjector::disabled();
        let mut data = b"7777:naoexiste;A;B;0;hi".to_vec();
        let original = data.clone();
        for _ in 0..100 {
            injector.inject(&mut data);
        }
        assert_eq!(data, original);
    }

    #[test]
    fn certain_probability_changes_exactly_one_byte_by_one() {
        let injector = ErrorInjector::new(1.0);
        let original = b"7777:naoexiste;A;B;0;hi".to_vec();
        let mut data = original.clone();

        injector.inject(&mut data);

        assert_eq!(data.len(), original.len());
        let diffs: Vec<usize> = (0..data.len()).filter(|&i| data[i] != original[i]).collect();
        assert_eq!(diffs.len(), 1);
        let i = diffs[0];
        assert_eq!(data[i], original[i].wrapping_add(1));
    }

    #[test]
    fn empty_buffer_is_ignored() {
        let injector = ErrorInjector::new(1.0);
        let mut data: Vec<u8> = Vec::new();
        injector.inject(&mut data);
        assert!(data.is_empty());
    }
}
