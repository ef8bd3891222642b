//! Operation envelopes.
//!
//! An [`Envelope`] is one queued operation: the normalized key that routes
//! it, the caller's path, the operation with its arguments, and the reply
//! half of its completion. Envelopes are consumed when executed.

use std::time::Instant;

use filelane_types::{FileKey, FilePath, OpKind};

use crate::dispatch::Reply;
use crate::error::FilesError;
use crate::handle::FileHandle;

/// Operation and its reply channel.
pub(crate) enum Operation {
    Create {
        reply: Reply<FileHandle>,
    },
    CreateFolder {
        reply: Reply<FilePath>,
    },
    Open {
        reply: Reply<FileHandle>,
    },
    Read {
        reply: Reply<Vec<u8>>,
    },
    ReadString {
        reply: Reply<String>,
    },
    Write {
        data: Vec<u8>,
        reply: Reply<FileHandle>,
    },
    Close {
        reply: Reply<()>,
    },
}

impl Operation {
    pub(crate) fn kind(&self) -> OpKind {
        match self {
            Operation::Create { .. } => OpKind::Create,
            Operation::CreateFolder { .. } => OpKind::CreateFolder,
            Operation::Open { .. } => OpKind::Open,
            Operation::Read { .. } | Operation::ReadString { .. } => OpKind::Read,
            Operation::Write { .. } => OpKind::Write,
            Operation::Close { .. } => OpKind::Close,
        }
    }

    /// Complete the operation with an error without executing it.
    pub(crate) fn reject(self, err: FilesError) {
        match self {
            Operation::Create { reply } | Operation::Open { reply } | Operation::Write { reply, .. } => {
                reply.deliver(Err(err))
            }
            Operation::CreateFolder { reply } => reply.deliver(Err(err)),
            Operation::Read { reply } => reply.deliver(Err(err)),
            Operation::ReadString { reply } => reply.deliver(Err(err)),
            Operation::Close { reply } => reply.deliver(Err(err)),
        }
    }
}

/// One queued operation.
pub(crate) struct Envelope {
    pub key: FileKey,
    pub path: FilePath,
    pub op: Operation,
    pub submitted: Instant,
    /// Issued by the manager itself; accepted while shutting down.
    pub internal: bool,
}

impl Envelope {
    pub(crate) fn new(key: FileKey, path: FilePath, op: Operation) -> Self {
        Self {
            key,
            path,
            op,
            submitted: Instant::now(),
            internal: false,
        }
    }

    pub(crate) fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub(crate) fn kind(&self) -> OpKind {
        self.op.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch;
    use filelane_types::CaseFolding;

    #[tokio::test]
    async fn test_reject_resolves_completion() {
        let path = FilePath::parse("/a.txt").unwrap();
        let (reply, completion) = dispatch::channel();
        let envelope = Envelope::new(
            path.key(CaseFolding::Lowercase),
            path,
            Operation::Write {
                data: b"x".to_vec(),
                reply,
            },
        );
        assert_eq!(envelope.kind(), OpKind::Write);
        assert!(!envelope.internal);

        envelope.op.reject(FilesError::ShuttingDown);
        assert!(matches!(completion.await, Err(FilesError::ShuttingDown)));
    }

    #[test]
    fn test_read_string_counts_as_read() {
        let (reply, _completion) = dispatch::channel();
        assert_eq!(Operation::ReadString { reply }.kind(), OpKind::Read);
    }
}
