//! Extension trait for teeing a stream with method syntax.

use crate::{tee, tee_with_options, TeeError, TeeOptions, TeeStream};
use futures_util::stream::Stream;

/// Extension trait adding [`tee`] to any [`Stream`] with cloneable items.
pub trait TeeStreamExt: Stream {
    /// Splits this stream into two coordinated outputs with the default
    /// bound of one item. Equivalent to [`tee`].
    ///
    /// ```
    /// use stream_tee::TeeStreamExt;
    /// use futures_util::stream;
    /// use futures_util::StreamExt;
    ///
    /// # tokio_test::block_on(async {
    /// let (a, b) = stream::iter(vec![1, 2]).tee();
    /// let (left, right) = tokio::join!(a.collect::<Vec<_>>(), b.collect::<Vec<_>>());
    /// assert_eq!(left, right);
    /// # });
    /// ```
    fn tee(self) -> (TeeStream<Self>, TeeStream<Self>)
    where
        Self: Sized + Unpin,
        Self::Item: Clone,
    {
        tee(self)
    }

    /// Splits this stream with an explicit [`TeeOptions`]. Equivalent to
    /// [`tee_with_options`].
    fn tee_with_options(
        self,
        options: TeeOptions,
    ) -> Result<(TeeStream<Self>, TeeStream<Self>), TeeError>
    where
        Self: Sized + Unpin,
        Self::Item: Clone,
    {
        tee_with_options(self, options)
    }
}

impl<S> TeeStreamExt for S where S: Stream {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use futures_util::StreamExt as FuturesStreamExt;

    #[tokio::test]
    async fn test_tee_trait_works() {
        let data = vec![1, 2, 3];

        let (a, b) = stream::iter(data.clone()).tee();
        let (left, right) = tokio::join!(a.collect::<Vec<i32>>(), b.collect::<Vec<i32>>());

        assert_eq!(left, data);
        assert_eq!(right, data);
    }

    #[tokio::test]
    async fn test_options_by_method_still_validate() {
        let options = TeeOptions::new().max_chunk_difference(-3.0);
        let result = stream::iter(vec![1]).tee_with_options(options);

        assert!(matches!(
            result,
            Err(TeeError::InvalidMaxChunkDifference(value)) if value == -3.0
        ));
    }
}
