//! Query result envelope.

/// A query payload together with optional total-count metadata.
///
/// For sequence results the total is the number of rows that matched
/// before paging. When no page was requested it equals the number of rows
/// returned. Scalar results carry no total unless one is given explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEnvelope<R> {
    result: R,
    total: Option<usize>,
}

impl<R> ResultEnvelope<R> {
    /// Wraps a scalar result without a total.
    #[must_use]
    pub fn scalar(result: R) -> Self {
        Self {
            result,
            total: None,
        }
    }

    /// Wraps a result with an explicit total.
    #[must_use]
    pub fn with_total(result: R, total: usize) -> Self {
        Self {
            result,
            total: Some(total),
        }
    }

    /// Returns the payload.
    #[must_use]
    pub fn result(&self) -> &R {
        &self.result
    }

    /// Unwraps the payload, discarding the metadata.
    #[must_use]
    pub fn into_result(self) -> R {
        self.result
    }

    /// Returns the total count, if known.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Maps the payload while keeping the total.
    pub fn map<U, F>(self, f: F) -> ResultEnvelope<U>
    where
        F: FnOnce(R) -> U,
    {
        ResultEnvelope {
            result: f(self.result),
            total: self.total,
        }
    }

    /// Splits the envelope into payload and total.
    #[must_use]
    pub fn into_parts(self) -> (R, Option<usize>) {
        (self.result, self.total)
    }
}

impl<T> ResultEnvelope<Vec<T>> {
    /// Wraps a sequence; the total defaults to its length.
    #[must_use]
    pub fn sequence(rows: Vec<T>) -> Self {
        let total = rows.len();
        Self {
            result: rows,
            total: Some(total),
        }
    }

    /// Number of rows in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.result.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_total_defaults_to_len() {
        let envelope = ResultEnvelope::sequence(vec![1, 2, 3]);
        assert_eq!(envelope.total(), Some(3));
        assert_eq!(envelope.len(), 3);
    }

    #[test]
    fn scalar_has_no_total() {
        let envelope = ResultEnvelope::scalar(true);
        assert_eq!(envelope.total(), None);
        assert!(envelope.into_result());
    }

    #[test]
    fn map_keeps_total() {
        let envelope = ResultEnvelope::with_total(vec![1, 2], 10);
        let mapped = envelope.map(|rows| rows.into_iter().map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(mapped.total(), Some(10));
        assert_eq!(mapped.into_result(), vec![2, 4]);
    }
}
