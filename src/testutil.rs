// testutil.rs
// Test-only actors for observing messages in scenario tests

use actix::prelude::*;
use tokio::sync::mpsc;

/// Records every message it receives onto an mpsc channel, so tests can
/// await deliveries with a timeout.
pub struct Collector<M>
where
    M: Message<Result = ()> + Send + 'static,
{
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Collector<M>
where
    M: Message<Result = ()> + Send + 'static,
{
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<M>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<M> Actor for Collector<M>
where
    M: Message<Result = ()> + Send + 'static,
{
    type Context = Context<Self>;
}

impl<M> Handler<M> for Collector<M>
where
    M: Message<Result = ()> + Send + 'static,
{
    type Result = ();

    fn handle(&mut self, msg: M, _ctx: &mut Self::Context) {
        let _ = self.tx.send(msg);
    }
}
