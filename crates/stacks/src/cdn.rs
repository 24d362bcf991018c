//! Content distribution in front of the shared ingress and the media bucket.
//!
//! Dynamic traffic goes to the load balancer uncached. Requests under the
//! media path are served from the bucket with caching enabled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topology::{
    BaseComponent, BaseEnvironment, ResourceHandle, ResourceKind, ResourceProvider, SharedIngress,
};

use crate::config::CdnConfig;
use crate::{external, StackError};

/// Edge locations the distribution is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceClass {
    /// North America and Europe.
    #[default]
    PriceClass100,
    /// Adds Asia, the Middle East and Africa.
    PriceClass200,
    PriceClassAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum AllowedMethods {
    AllowAll,
    AllowGetHead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ViewerProtocolPolicy {
    RedirectToHttps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum CachePolicy {
    CachingDisabled,
    CachingOptimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ResponseHeadersPolicy {
    CorsAllowAllOriginsWithPreflightAndSecurityHeaders,
    CorsAllowAllOriginsAndSecurityHeaders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum OriginRequestPolicy {
    AllViewer,
    CorsS3Origin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Origin {
    LoadBalancer { load_balancer: ResourceHandle },
    Bucket { bucket: ResourceHandle },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CacheBehavior {
    origin: Origin,
    allowed_methods: AllowedMethods,
    viewer_protocol_policy: ViewerProtocolPolicy,
    cache_policy: CachePolicy,
    response_headers_policy: ResponseHeadersPolicy,
    origin_request_policy: OriginRequestPolicy,
    compress: bool,
}

impl CacheBehavior {
    fn dynamic(load_balancer: ResourceHandle) -> Self {
        Self {
            origin: Origin::LoadBalancer { load_balancer },
            allowed_methods: AllowedMethods::AllowAll,
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            cache_policy: CachePolicy::CachingDisabled,
            response_headers_policy:
                ResponseHeadersPolicy::CorsAllowAllOriginsWithPreflightAndSecurityHeaders,
            origin_request_policy: OriginRequestPolicy::AllViewer,
            compress: true,
        }
    }

    fn static_files(bucket: ResourceHandle) -> Self {
        Self {
            origin: Origin::Bucket { bucket },
            allowed_methods: AllowedMethods::AllowGetHead,
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            cache_policy: CachePolicy::CachingOptimized,
            response_headers_policy: ResponseHeadersPolicy::CorsAllowAllOriginsAndSecurityHeaders,
            origin_request_policy: OriginRequestPolicy::CorsS3Origin,
            compress: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct CertificateProperties<'a> {
    certificate_arn: &'a str,
    imported: bool,
}

#[derive(Debug, Serialize)]
struct DistributionProperties {
    certificate: ResourceHandle,
    default_behavior: CacheBehavior,
    additional_behaviors: BTreeMap<String, CacheBehavior>,
    price_class: PriceClass,
}

/// An imported certificate and the distribution that serves with it.
#[derive(Debug, Clone)]
pub struct ContentDistribution {
    certificate: ResourceHandle,
    distribution: ResourceHandle,
}

impl ContentDistribution {
    /// Declares `build("certificate")` and `build("cdn")`.
    ///
    /// # Errors
    ///
    /// Propagates provider rejections.
    pub fn new<P: ResourceProvider>(
        scope: &mut BaseEnvironment<P>,
        component: &BaseComponent,
        ingress: &SharedIngress,
        media: &ResourceHandle,
        config: &CdnConfig,
    ) -> Result<Self, StackError> {
        let identity = component.identity();

        let certificate = external(
            ResourceKind::Certificate,
            &CertificateProperties {
                certificate_arn: &config.certificate_arn,
                imported: true,
            },
            Vec::new(),
        )?;
        let certificate = scope.declare_with_id(identity.logical_id("certificate"), certificate)?;

        let properties = DistributionProperties {
            certificate: certificate.clone(),
            default_behavior: CacheBehavior::dynamic(ingress.load_balancer().clone()),
            additional_behaviors: BTreeMap::from([(
                config.media_path.clone(),
                CacheBehavior::static_files(media.clone()),
            )]),
            price_class: config.price_class,
        };
        let distribution = external(
            ResourceKind::Distribution,
            &properties,
            vec![
                certificate.clone(),
                ingress.load_balancer().clone(),
                media.clone(),
            ],
        )?;
        let distribution = scope.declare_with_id(identity.logical_id("cdn"), distribution)?;

        tracing::info!(distribution = %distribution.id(), "Content distribution declared");
        Ok(Self {
            certificate,
            distribution,
        })
    }

    pub fn certificate(&self) -> &ResourceHandle {
        &self.certificate
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology::LogicalId;

    fn handle(id: &str, kind: ResourceKind) -> ResourceHandle {
        ResourceHandle::new(LogicalId::new(id).unwrap(), kind)
    }

    #[test]
    fn test_behaviors_render_policy_names() {
        let behavior = CacheBehavior::static_files(handle("media", ResourceKind::Bucket));
        let value = serde_json::to_value(behavior).unwrap();

        assert_eq!(value["origin"]["type"], "bucket");
        assert_eq!(value["allowed_methods"], "ALLOW_GET_HEAD");
        assert_eq!(value["cache_policy"], "CACHING_OPTIMIZED");
        assert_eq!(value["origin_request_policy"], "CORS_S3_ORIGIN");
        assert_eq!(value["viewer_protocol_policy"], "REDIRECT_TO_HTTPS");
    }

    #[test]
    fn test_dynamic_behavior_disables_caching() {
        let behavior = CacheBehavior::dynamic(handle("lb", ResourceKind::LoadBalancer));
        assert_eq!(behavior.cache_policy, CachePolicy::CachingDisabled);
        assert_eq!(behavior.allowed_methods, AllowedMethods::AllowAll);
        assert!(behavior.compress);
    }

    #[test]
    fn test_price_class_uses_variant_names() {
        assert_eq!(serde_json::to_value(PriceClass::default()).unwrap(), "PriceClass100");
    }
}
