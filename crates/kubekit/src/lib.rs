//! # kubekit
//!
//! Reconcile Kubernetes manifests through `kubectl`.
//!
//! This crate provides functionality for:
//! - Normalizing YAML/JSON manifests to a canonical, comparable form
//! - Decoding an object's self-link into something kubectl can address
//! - Creating, reading, updating and deleting a tracked object
//!
//! A tracked object is identified by the self-link kubectl reports when it
//! is created. All cluster access goes through the kubectl executable, one
//! synchronous invocation at a time; nothing here talks to the API server
//! directly.
//!
//! ## Example
//!
//! ```no_run
//! use kubekit::{Manifest, ResourceRecord};
//!
//! let manifest = Manifest::new().expect("kubectl not available");
//!
//! let mut record = ResourceRecord::new("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: demo\n");
//! manifest.create(&mut record).expect("create failed");
//! println!("tracking {}", record.id.as_deref().unwrap_or_default());
//!
//! // Later: pick up drift, then tear down
//! manifest.read(&mut record).expect("read failed");
//! manifest.delete(&mut record).expect("delete failed");
//! ```
//!
//! ## Testing
//!
//! The [`Runner`] trait is the only place a process is spawned. Swap in
//! [`MockRunner`] to script kubectl's responses.
//!
//! ```
//! use kubekit::{Manifest, MockRunner, ResourceRecord};
//!
//! let runner = MockRunner::new()
//!     .respond("")
//!     .respond(r#"{"items":[{"metadata":{"selfLink":"api/v1/namespaces/ns1/widgets/w1"}}]}"#);
//! let manifest = Manifest::with_runner(&runner);
//!
//! let mut record = ResourceRecord::new(r#"{"a":1,"b":2}"#);
//! manifest.create(&mut record).unwrap();
//! assert_eq!(record.id.as_deref(), Some("api/v1/namespaces/ns1/widgets/w1"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod record;
pub mod runner;

pub use canonical::{attempt_canonicalize, canonicalize};
pub use error::{Error, ErrorCategory, LAST_APPLIED_ANNOTATION, Result, ShapeError};
pub use identity::{IdentityCodec, ObjectRef, SelfLinkCodec};
pub use manifest::Manifest;
pub use record::{ResourceRecord, ResourceState};
pub use runner::{KubectlRunner, MockRunner, Runner};
