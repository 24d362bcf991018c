//! Private object storage for media and static files.

use serde::Serialize;
use topology::{BaseComponent, BaseEnvironment, ResourceHandle, ResourceKind, ResourceProvider};

use crate::{external, StackError};

#[derive(Debug, Serialize)]
struct BucketProperties {
    access_control: &'static str,
    block_public_access: &'static str,
}

/// A bucket with every form of public access blocked. Only reachable through
/// the CDN.
#[derive(Debug, Clone)]
pub struct MediaBucket {
    handle: ResourceHandle,
}

impl MediaBucket {
    /// Declares the bucket under `build("media")`.
    ///
    /// # Errors
    ///
    /// Propagates provider rejections.
    pub fn new<P: ResourceProvider>(
        scope: &mut BaseEnvironment<P>,
        component: &BaseComponent,
    ) -> Result<Self, StackError> {
        let properties = BucketProperties {
            access_control: "private",
            block_public_access: "block_all",
        };
        let resource = external(ResourceKind::Bucket, &properties, Vec::new())?;
        let handle = scope.declare_with_id(component.identity().logical_id("media"), resource)?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}
