use std::{
    cell::Cell,
    future::{pending, Pending},
    pin::Pin,
    rc::Rc,
    sync::Arc,
};

use anyhow::{Context as _, Result};
use futures::future::Either;
use tokio::{
    io::{self, AsyncBufReadExt as _, BufReader},
    select,
    sync::mpsc,
    time::{sleep_until, Instant, Sleep},
};

use crate::{
    command::Command,
    config::Config,
    context::{PendingCall, Reply},
    output::WaybarCustomModule,
    rpc::{RpcResult, Transport},
    scheduler::SystemClock,
    session::Session,
};

type ReplySender = mpsc::Sender<(Reply, RpcResult)>;

/// Send every queued call on its own task. Answers come back on `sender`.
fn spawn_calls(session: &mut Session, transport: &Arc<dyn Transport>, sender: &ReplySender) {
    for PendingCall { call, reply } in session.take_calls() {
        tracing::debug!(method = %call.method, ?reply, "Sending request");
        let transport = Arc::clone(transport);
        let sender = sender.clone();
        tokio::spawn(async move {
            let result = transport.call(call).await;
            if sender.send((reply, result)).await.is_err() {
                tracing::debug!(?reply, "Event loop gone, dropping reply");
            }
        });
    }
}

fn next_timer(session: &Session) -> Pin<Box<Either<Sleep, Pending<()>>>> {
    Box::pin(match session.next_deadline() {
        Some(deadline) => Either::Left(sleep_until(Instant::from_std(deadline))),
        None => Either::Right(pending()),
    })
}

pub async fn event_loop(transport: Arc<dyn Transport>, config: Config) -> Result<()> {
    let mut session = Session::new(&config, SystemClock);
    let dirty = Rc::new(Cell::new(true));
    {
        let dirty = Rc::clone(&dirty);
        session.subscribe(move |event| {
            tracing::trace!(?event, "Event");
            dirty.set(true);
        });
    }
    session.attach_playlist(config.playlist.clone());
    session.start();

    let (reply_sender, mut reply_receiver) = mpsc::channel(16);
    let mut stdin = BufReader::new(io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_output: Option<WaybarCustomModule> = None;

    loop {
        spawn_calls(&mut session, &transport, &reply_sender);

        if dirty.replace(false) {
            let module = WaybarCustomModule::from_session(&session, &config.output);
            if last_output.as_ref() != Some(&module) {
                module.print().context("Failed to write module to stdout")?;
                last_output = Some(module);
            }
        }

        let mut timer = next_timer(&session);
        select! {
            Some((reply, result)) = reply_receiver.recv() => {
                session.handle_reply(reply, result);
            }
            () = &mut timer => session.fire_due_timers(),
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line, session.controls()) {
                    Ok(Some(command)) => {
                        tracing::debug!(?command, "Running command");
                        session.run(command);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(%e, "Ignoring command"),
                },
                Ok(None) => {
                    tracing::info!("Stdin closed, no more commands");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::error!(?e, "Failed to read from stdin");
                    stdin_open = false;
                }
            },
        }
    }
}
