use crate::Error;
use crate::channel::AmqpChannel;

use std::sync::Arc;

use async_trait::async_trait;
use switchyard_bus::Connection;

/// Reply code for a normal close.
pub(crate) const REPLY_SUCCESS: u16 = 200;

/// A connection to an AMQP broker. Clones share the socket.
#[derive(Clone)]
pub struct AmqpConnection {
    inner: Arc<lapin::Connection>,
}

impl AmqpConnection {
    pub(crate) fn new(connection: lapin::Connection) -> Self {
        Self {
            inner: Arc::new(connection),
        }
    }
}

impl std::fmt::Debug for AmqpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpConnection")
            .field("state", &self.inner.status().state())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for AmqpConnection {
    type Error = Error;
    type Channel = AmqpChannel;

    async fn open_channel(&self) -> Result<AmqpChannel, Error> {
        let channel = self.inner.create_channel().await?;
        Ok(AmqpChannel::new(channel))
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_open() {
            return Ok(());
        }

        self.inner.close(REPLY_SUCCESS, "OK").await?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.status().connected()
    }
}
