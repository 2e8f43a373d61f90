//! Bounded token channel between a tokenizer thread and the parser.
//!
//! The tokenizer runs on its own thread and pushes tokens into a bounded
//! channel. Its sender is dropped on every exit path, which closes the
//! channel. The consumer side must keep receiving until it observes the
//! closure, even when the parser stopped early, so that the producer is never
//! left blocked on a full buffer. [`with_channel`] enforces both halves of
//! that contract.

use std::{
    sync::mpsc::{sync_channel, Receiver, SyncSender},
    thread,
};

use crate::{lexer::Lexer, token::Token};

/// Number of tokens the producer may run ahead of the consumer.
pub const CHANNEL_CAPACITY: usize = 2;

/// Runs `consume` against a channel fed by a tokenizer thread scanning `src`.
///
/// Once `consume` returns (whatever its outcome), the remaining tokens are
/// drained and the tokenizer thread is joined before returning.
pub fn with_channel<R>(src: &str, consume: impl FnOnce(&mut TokenChannel) -> R) -> R {
    thread::scope(|s| {
        let (sender, receiver) = sync_channel(CHANNEL_CAPACITY);
        let producer = s.spawn(move || produce(src, &sender));

        let mut channel = TokenChannel::new(receiver);
        let result = consume(&mut channel);
        let drained = channel.drain();
        log::trace!(
            "token channel closed after {} tokens ({drained} drained)",
            channel.received
        );

        if let Err(panic) = producer.join() {
            std::panic::resume_unwind(panic);
        }
        result
    })
}

/// Scans the whole input, sending every token. The channel closes when
/// `sender` is dropped by the caller, right after this returns.
fn produce(src: &str, sender: &SyncSender<Token>) {
    for token in Lexer::new(src) {
        if sender.send(token).is_err() {
            // The receiving end is gone; nobody is listening anymore.
            break;
        }
    }
}

/// The consumer end of the token channel.
pub struct TokenChannel {
    receiver: Receiver<Token>,
    received: usize,
    closed: bool,
}

impl TokenChannel {
    fn new(receiver: Receiver<Token>) -> TokenChannel {
        TokenChannel {
            receiver,
            received: 0,
            closed: false,
        }
    }

    /// Receives and discards tokens until the producer closes the channel.
    /// Returns the number of discarded tokens.
    pub fn drain(&mut self) -> usize {
        self.by_ref().count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for TokenChannel {
    type Item = Token;

    /// Blocks until a token is available. Returns `None` once the producer
    /// closed the channel.
    fn next(&mut self) -> Option<Token> {
        if self.closed {
            return None;
        }
        match self.receiver.recv() {
            Ok(token) => {
                self.received += 1;
                Some(token)
            }
            Err(_) => {
                self.closed = true;
                None
            }
        }
    }
}
