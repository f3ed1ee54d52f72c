//! The task that owns the transport.
//!
//! One supervisor per client. It opens the connection, feeds transport
//! events and caller requests into the [`Session`] strictly in arrival
//! order, performs the resulting actions, and reopens the connection
//! whenever it closes.

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::io::WriteHalf;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{AquosCodec, Framing};
use crate::config::ClientConfig;
use crate::error::AquosError;
use crate::network::{ConnectionInfo, Connector};
use crate::session::{Action, Session, TransportEvent};
use crate::state::{ConnectionState, Request};

/// Messages from client handles.
#[derive(Debug)]
pub(crate) enum Control {
    Submit(Request),
    Close,
}

/// Fires once, when the first handshake finishes either way.
pub(crate) type ReadySender = oneshot::Sender<Result<(), AquosError>>;

/// How one connection ended.
enum Link {
    /// Transport gone; reconnect.
    Closed,
    /// The client asked to close.
    Shutdown,
}

enum Wake {
    Frame(Option<Result<String, AquosError>>),
    Control(Option<Control>),
    Deadline,
}

type Writer<S> = FramedWrite<WriteHalf<S>, AquosCodec>;

pub(crate) struct Supervisor<C: Connector> {
    info: ConnectionInfo,
    framing: Framing,
    reconnect_delay: Duration,
    connector: C,
    session: Session,
    control: mpsc::Receiver<Control>,
    state_tx: watch::Sender<ConnectionState>,
    ready: Option<ReadySender>,
}

impl<C: Connector> Supervisor<C> {
    pub(crate) fn new(
        config: &ClientConfig,
        connector: C,
        control: mpsc::Receiver<Control>,
        state_tx: watch::Sender<ConnectionState>,
        ready: ReadySender,
    ) -> Self {
        Self {
            info: config.connection_info(),
            framing: config.framing,
            reconnect_delay: config.reconnect_delay(),
            connector,
            session: Session::new(config),
            control,
            state_tx,
            ready: Some(ready),
        }
    }

    pub(crate) async fn run(mut self) {
        let result = self.supervise().await;
        self.session.shutdown();
        self.publish();

        match (self.ready.take(), result) {
            (Some(ready), Err(err)) => {
                let _ = ready.send(Err(err));
            }
            (Some(ready), Ok(())) => {
                let _ = ready.send(Err(AquosError::Closed));
            }
            (None, Err(err)) => error!(addr = %self.info, error = %err, "connection terminated"),
            (None, Ok(())) => info!(addr = %self.info, "client closed"),
        }
    }

    async fn supervise(&mut self) -> Result<(), AquosError> {
        let mut connected_once = false;
        loop {
            self.session.begin_connect()?;
            self.publish();
            info!(addr = %self.info, "connecting");

            let stream = match self.connector.connect(&self.info).await {
                Ok(stream) => stream,
                // The first attempt is not retried.
                Err(e) if !connected_once => return Err(e.into()),
                Err(e) => {
                    self.session.handle(TransportEvent::Errored(e.into()));
                    self.session.handle(TransportEvent::Closed);
                    self.publish();
                    if self.pause().await {
                        return Ok(());
                    }
                    continue;
                }
            };
            connected_once = true;

            match self.drive(stream).await? {
                Link::Closed => {
                    info!(addr = %self.info, "reconnecting");
                    if self.pause().await {
                        return Ok(());
                    }
                }
                Link::Shutdown => return Ok(()),
            }
        }
    }

    /// Run one connection until it closes.
    async fn drive(&mut self, stream: C::Stream) -> Result<Link, AquosError> {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FramedRead::new(read_half, AquosCodec::new(self.framing));
        let mut writer = FramedWrite::new(write_half, AquosCodec::new(self.framing));

        let actions = self.session.handle(TransportEvent::Connected);
        if let Some(link) = self.apply(actions, &mut writer).await? {
            return Ok(link);
        }

        loop {
            let deadline = self.session.channel().next_deadline();
            let wake = tokio::select! {
                frame = reader.next() => Wake::Frame(frame),
                msg = self.control.recv() => Wake::Control(msg),
                _ = wait_until(deadline) => Wake::Deadline,
            };

            let actions = match wake {
                Wake::Frame(Some(Ok(text))) => {
                    debug!(rx = %text.escape_debug(), "received");
                    self.session.handle(TransportEvent::Data(text))
                }
                Wake::Frame(Some(Err(e))) => {
                    self.session.handle(TransportEvent::Errored(e));
                    vec![Action::Close]
                }
                Wake::Frame(None) => vec![Action::Close],
                Wake::Control(Some(Control::Submit(request))) => self.session.submit(request),
                Wake::Control(Some(Control::Close) | None) => {
                    let _ = writer.close().await;
                    return Ok(Link::Shutdown);
                }
                Wake::Deadline => self.session.tick(Instant::now()),
            };

            if let Some(link) = self.apply(actions, &mut writer).await? {
                return Ok(link);
            }
        }
    }

    /// Perform session actions in order.
    ///
    /// Returns `Some` when the connection is over.
    async fn apply(
        &mut self,
        actions: Vec<Action>,
        writer: &mut Writer<C::Stream>,
    ) -> Result<Option<Link>, AquosError> {
        let mut close = false;
        for action in actions {
            match action {
                Action::Write(out) => {
                    let wire = out.wire();
                    debug!(tx = %wire.escape_debug(), "sending");
                    if let Err(e) = writer.send(out).await {
                        self.session.handle(TransportEvent::Errored(e));
                        close = true;
                        break;
                    }
                }
                Action::Ready => {
                    self.publish();
                    self.signal_ready();
                }
                Action::Close => close = true,
                Action::Fail(err) => {
                    let _ = writer.close().await;
                    return Err(err);
                }
            }
        }

        if close {
            let _ = writer.close().await;
            self.session.handle(TransportEvent::Closed);
            self.publish();
            return Ok(Some(Link::Closed));
        }
        self.publish();
        Ok(None)
    }

    fn signal_ready(&mut self) {
        match self.ready.take() {
            Some(ready) => {
                info!(addr = %self.info, "ready");
                let _ = ready.send(Ok(()));
            }
            None => info!(addr = %self.info, "reconnected"),
        }
    }

    /// Sleep out the reconnect delay while still taking requests.
    ///
    /// Returns `true` if the client closed meanwhile.
    async fn pause(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(sleep);
        loop {
            let msg = tokio::select! {
                _ = &mut sleep => return false,
                msg = self.control.recv() => msg,
            };
            match msg {
                Some(Control::Submit(request)) => {
                    // Not ready, so this only queues or rejects.
                    let actions = self.session.submit(request);
                    if !actions.is_empty() {
                        warn!("dropping writes while disconnected");
                    }
                }
                Some(Control::Close) | None => return true,
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.session.state());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}
