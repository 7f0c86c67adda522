//! Browser host for the controller's poll loop: futures run on the
//! microtask queue, ticks come from `window.setInterval`.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::mpsc;
use futures::future::LocalBoxFuture;
use futures::stream::{self, LocalBoxStream, Stream, StreamExt};
use tracing::error;
use verso::runtime::{Runtime, MIN_PERIOD};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct WasmRuntime;

impl Runtime for WasmRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn ticks(&self, period: Duration) -> LocalBoxStream<'static, ()> {
        match IntervalStream::start(period.max(MIN_PERIOD)) {
            Ok(ticks) => ticks.boxed_local(),
            Err(e) => {
                error!("failed to start interval: {e}");
                stream::empty().boxed_local()
            }
        }
    }
}

/// One `setInterval` registration. Dropping it clears the interval.
struct IntervalStream {
    handle: i32,
    rx: mpsc::UnboundedReceiver<()>,
    _callback: Closure<dyn FnMut()>,
}

impl IntervalStream {
    fn start(period: Duration) -> Result<Self, String> {
        let window = web_sys::window().ok_or("no window")?;
        let (tx, rx) = mpsc::unbounded();
        let callback = Closure::wrap(Box::new(move || {
            let _ = tx.unbounded_send(());
        }) as Box<dyn FnMut()>);

        let millis = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
        let handle = window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                millis,
            )
            .map_err(|_| "setInterval threw".to_string())?;

        Ok(Self {
            handle,
            rx,
            _callback: callback,
        })
    }
}

impl Stream for IntervalStream {
    type Item = ();

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<()>> {
        // Ticks that piled up while the loop was busy collapse into one.
        let mut fired = false;
        loop {
            match self.rx.poll_next_unpin(cx) {
                Poll::Ready(Some(())) => fired = true,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => break,
            }
        }
        if fired {
            Poll::Ready(Some(()))
        } else {
            Poll::Pending
        }
    }
}

impl Drop for IntervalStream {
    fn drop(&mut self) {
        if let Some(w) = web_sys::window() {
            w.clear_interval_with_handle(self.handle);
        }
    }
}
