use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Misuse of the closable queue contract. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue '{0}' must have a capacity of at least 1")]
    ZeroCapacity(&'static str),
    #[error("send on closed queue '{0}'")]
    SendAfterClose(&'static str),
    #[error("queue '{0}' closed more than once")]
    AlreadyClosed(&'static str),
    #[error("reader of queue '{0}' went away")]
    ReaderGone(&'static str),
}

/// Result of [`QueueReader::receive`].
#[derive(Debug, PartialEq, Eq)]
pub enum Received<T> {
    Item(T),
    /// The writer closed the queue and every buffered item has been taken.
    Closed,
}

/// Creates a bounded single-producer/single-consumer queue with an explicit close signal.
pub fn bounded<T>(
    name: &'static str,
    capacity: usize,
) -> Result<(QueueWriter<T>, QueueReader<T>), QueueError> {
    if capacity == 0 {
        return Err(QueueError::ZeroCapacity(name));
    }
    let (sender, receiver) = mpsc::channel(capacity);
    Ok((
        QueueWriter {
            name,
            sender: Some(sender),
        },
        QueueReader { name, receiver },
    ))
}

/// Writing half; owned by exactly one stage.
#[derive(Debug)]
pub struct QueueWriter<T> {
    name: &'static str,
    sender: Option<mpsc::Sender<T>>,
}

impl<T> QueueWriter<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends `item`, suspending while the queue is at capacity.
    pub async fn send(&self, item: T) -> Result<(), QueueError> {
        let Some(sender) = &self.sender else {
            return Err(QueueError::SendAfterClose(self.name));
        };
        sender
            .send(item)
            .await
            .map_err(|_| QueueError::ReaderGone(self.name))
    }

    /// Signals that no further items will be sent. Buffered items stay readable.
    pub fn close(&mut self) -> Result<(), QueueError> {
        match self.sender.take() {
            Some(_) => Ok(()),
            None => Err(QueueError::AlreadyClosed(self.name)),
        }
    }
}

impl<T> Drop for QueueWriter<T> {
    fn drop(&mut self) {
        if self.sender.is_some() && !std::thread::panicking() {
            warn!(stage = "queue", queue = self.name, "queue writer dropped without close");
        }
    }
}

/// Reading half; owned by exactly one stage.
#[derive(Debug)]
pub struct QueueReader<T> {
    name: &'static str,
    receiver: mpsc::Receiver<T>,
}

impl<T> QueueReader<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Takes the next item in FIFO order, suspending while the queue is empty and open.
    ///
    /// Returns [`Received::Closed`] once the writer is gone and the buffer is
    /// drained, and keeps returning it on later calls.
    pub async fn receive(&mut self) -> Received<T> {
        match self.receiver.recv().await {
            Some(item) => Received::Item(item),
            None => Received::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn zero_capacity_is_rejected() {
        let err = bounded::<u32>("work", 0).expect_err("zero capacity");
        assert_eq!(err, QueueError::ZeroCapacity("work"));
    }

    #[tokio::test]
    async fn delivers_in_fifo_order_then_closed() {
        let (mut writer, mut reader) = bounded("work", 4).expect("queue");
        for value in 1..=3 {
            writer.send(value).await.expect("send");
        }
        writer.close().expect("close");

        assert_eq!(reader.receive().await, Received::Item(1));
        assert_eq!(reader.receive().await, Received::Item(2));
        assert_eq!(reader.receive().await, Received::Item(3));
        assert_eq!(reader.receive().await, Received::Closed);
        assert_eq!(reader.receive().await, Received::Closed);
    }

    #[tokio::test]
    async fn close_on_empty_queue_releases_waiting_reader() {
        let (mut writer, mut reader) = bounded::<u32>("work", 1).expect("queue");
        let waiter = tokio::spawn(async move { reader.receive().await });

        tokio::task::yield_now().await;
        writer.close().expect("close");

        let received = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("reader should not hang")
            .expect("reader task");
        assert_eq!(received, Received::Closed);
    }

    #[tokio::test]
    async fn send_after_close_is_a_protocol_violation() {
        let (mut writer, _reader) = bounded("results", 2).expect("queue");
        writer.close().expect("close");

        let err = writer.send(7).await.expect_err("send after close");
        assert_eq!(err, QueueError::SendAfterClose("results"));
    }

    #[test]
    fn double_close_is_a_protocol_violation() {
        let (mut writer, _reader) = bounded::<u32>("results", 2).expect("queue");
        writer.close().expect("first close");

        let err = writer.close().expect_err("second close");
        assert_eq!(err, QueueError::AlreadyClosed("results"));
    }

    #[tokio::test]
    async fn send_without_reader_fails() {
        let (mut writer, reader) = bounded("work", 2).expect("queue");
        drop(reader);

        let err = writer.send(1).await.expect_err("reader dropped");
        assert_eq!(err, QueueError::ReaderGone("work"));
        writer.close().expect("close");
    }

    #[tokio::test]
    async fn dropped_writer_reads_as_closed_after_drain() {
        let (writer, mut reader) = bounded("work", 2).expect("queue");
        writer.send(5).await.expect("send");
        drop(writer);

        assert_eq!(reader.receive().await, Received::Item(5));
        assert_eq!(reader.receive().await, Received::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_suspends_writer_until_reader_frees_space() {
        let (mut writer, mut reader) = bounded("work", 1).expect("queue");
        writer.send(1).await.expect("first send fits");

        let blocked = timeout(Duration::from_millis(50), writer.send(2)).await;
        assert!(blocked.is_err(), "send on a full queue should suspend");

        assert_eq!(reader.receive().await, Received::Item(1));
        timeout(Duration::from_millis(50), writer.send(3))
            .await
            .expect("space was freed")
            .expect("send");
        writer.close().expect("close");

        assert_eq!(reader.receive().await, Received::Item(3));
        assert_eq!(reader.receive().await, Received::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_writer_and_reader_preserve_order() {
        let (mut writer, mut reader) = bounded("work", 2).expect("queue");
        let producer = tokio::spawn(async move {
            for value in 0..500u32 {
                writer.send(value).await.expect("send");
            }
            writer.close().expect("close");
        });

        let mut seen = Vec::new();
        while let Received::Item(value) = reader.receive().await {
            seen.push(value);
        }
        producer.await.expect("producer task");

        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }
}
