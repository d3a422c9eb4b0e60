//! Control thread owning the state machine.

use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use crate::worker::WorkerFactory;

use super::state::{ControlMessage, Machine};

/// Returned by the control thread so shutdown can finish on the caller.
pub(crate) type Parked<F> = (Machine<F>, Receiver<ControlMessage<F>>);

pub(crate) fn spawn<F: WorkerFactory>(
    machine: Machine<F>,
    inbox: Receiver<ControlMessage<F>>,
) -> io::Result<JoinHandle<Parked<F>>> {
    thread::Builder::new()
        .name("baton-control".to_owned())
        .spawn(move || run(machine, inbox))
}

fn run<F: WorkerFactory>(mut machine: Machine<F>, inbox: Receiver<ControlMessage<F>>) -> Parked<F> {
    while let Ok(message) = inbox.recv() {
        if !machine.handle(message) {
            break;
        }
    }
    (machine, inbox)
}
