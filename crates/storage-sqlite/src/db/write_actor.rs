//! Single-writer actor.
//!
//! SQLite allows one writer at a time. All mutations are funnelled through a
//! dedicated thread holding one connection, and each job runs inside an
//! immediate transaction that rolls back when the job returns an error.

use diesel::{Connection, SqliteConnection};
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use super::DbPool;
use crate::errors::StorageError;
use sfsync_core::{Error, Result};

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Error carried out of a rolled-back transaction.
enum TxError {
    Job(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Run `job` on the writer connection inside a transaction.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let boxed: Job = Box::new(move |conn| {
            let outcome = conn
                .immediate_transaction::<T, TxError, _>(|tx| job(tx).map_err(TxError::Job));
            let result = match outcome {
                Ok(value) => Ok(value),
                Err(TxError::Job(err)) => Err(err),
                Err(TxError::Diesel(err)) => Err(StorageError::from(err).into()),
            };
            let _ = reply_tx.send(result);
        });

        self.sender
            .send(boxed)
            .map_err(|_| StorageError::WriterClosed)?;
        reply_rx.await.map_err(|_| StorageError::WriterClosed)?
    }
}

/// Start the writer thread. It exits when every [`WriteHandle`] is dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

    std::thread::spawn(move || {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(err) => {
                error!("[Storage] Writer could not acquire a connection: {}", err);
                return;
            }
        };
        debug!("[Storage] Writer started");
        while let Some(job) = receiver.blocking_recv() {
            job(&mut *conn);
        }
        debug!("[Storage] Writer stopped");
    });

    WriteHandle { sender }
}
