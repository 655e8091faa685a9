//! Networking: ingress controller, DNS automation, load balancers.

use async_trait::async_trait;
use tracing::debug;

use super::{credential_binding, ingress_classes, ingresses, services, CheckGroup};
use crate::cluster::{ClusterQuery, StructuredResource};
use crate::config::NetworkingProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{check_workload, count_where, status_field_equals};
use crate::validation::report::{Outcome, Subsystem};

pub struct NetworkingChecks {
    profile: NetworkingProfile,
    credential_annotation: String,
}

impl NetworkingChecks {
    #[must_use]
    pub fn new(profile: NetworkingProfile, credential_annotation: String) -> Self {
        Self {
            profile,
            credential_annotation,
        }
    }
}

/// One pass per class, or a warning when there are none.
async fn ingress_class_outcomes(cluster: &dyn ClusterQuery) -> Vec<Outcome> {
    let classes = match cluster.list_custom_resources(&ingress_classes(), None).await {
        Ok(classes) => classes,
        Err(err) => {
            debug!(error = %err, "Failed to list IngressClasses");
            Vec::new()
        }
    };
    if classes.is_empty() {
        return vec![Outcome::warn("No IngressClasses found")];
    }
    classes
        .iter()
        .map(|class| {
            Outcome::pass(format!(
                "IngressClass: {} (controller: {})",
                class.name().unwrap_or_default(),
                class.str_field(&["spec", "controller"]).unwrap_or_default()
            ))
        })
        .collect()
}

fn has_load_balancer_address(ingress: &StructuredResource) -> bool {
    ingress
        .seq_field(&["status", "loadBalancer", "ingress"])
        .is_ok_and(|entries| !entries.is_empty())
}

#[async_trait]
impl CheckGroup for NetworkingChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Networking
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        let profile = &self.profile;

        rec.section(&profile.ingress_title);
        rec.record(check_workload(cluster, &profile.ingress_controller).await);
        for outcome in ingress_class_outcomes(cluster).await {
            rec.record(outcome);
        }

        rec.section(&profile.external_dns.name);
        rec.record(check_workload(cluster, &profile.external_dns).await);
        rec.record(
            credential_binding(
                cluster,
                &profile.external_dns_account,
                &self.credential_annotation,
                &profile.external_dns.name,
            )
            .await,
        );

        rec.section("Ingresses");
        match cluster.list_custom_resources(&ingresses(), None).await {
            Ok(items) => rec.pass(format!(
                "Ingresses: {} total, {} with LoadBalancer",
                items.len(),
                count_where(&items, has_load_balancer_address)
            )),
            Err(err) => {
                debug!(error = %err, "Failed to list ingresses");
                rec.warn("Could not list Ingresses");
            }
        }

        rec.section("Services");
        match cluster.list_custom_resources(&services(), None).await {
            Ok(items) => rec.pass(format!(
                "LoadBalancer services: {}",
                count_where(&items, |svc| {
                    status_field_equals(svc, &["spec", "type"], "LoadBalancer")
                })
            )),
            Err(err) => {
                debug!(error = %err, "Failed to list services");
                rec.warn("Could not list Services");
            }
        }
    }
}
