use crate::state;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use futures::StreamExt;
use futures::stream::select_all;
use tokio_stream::wrappers::WatchStream;

use std::convert::Infallible;

/// Streams one named event per collection change. The page script reloads
/// the view when one arrives; the payload carries no data of its own.
pub(crate) async fn events(
    State(state): State<state::AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let streams = state
        .live
        .subscriptions()
        .into_iter()
        .map(|(name, subscription)| {
            let mut receiver = subscription.into_receiver();
            // Only changes after the page was rendered count.
            receiver.borrow_and_update();
            WatchStream::from_changes(receiver)
                .map(move |_| Ok(Event::default().event(name).data("changed")))
        });
    tracing::debug!("opened change stream");
    Sse::new(select_all(streams)).keep_alive(KeepAlive::default())
}
