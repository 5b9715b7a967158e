//! Broker wrapper serving JSON requests

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as Json;
use tracing::instrument;

use cmpi_core::engine::StaticFactories;
use cmpi_core::{Broker, BrokerConfig, Data, IndicationEvent};

use crate::error::{ErrorReply, HostError, HostResult};
use crate::logging::init_logging;
use crate::request::{json_to_instance, json_to_named, json_to_value, HostCall, HostRequest};

/// Reply to one request: `{"ok": ...}` or `{"error": {"rc": .., "message": ..}}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Ok(Json),
    Error(ErrorReply),
}

impl From<HostResult<Json>> for Reply {
    fn from(result: HostResult<Json>) -> Self {
        match result {
            Ok(value) => Reply::Ok(value),
            Err(e) => Reply::Error(e.reply()),
        }
    }
}

/// A broker driven through JSON requests
#[derive(Debug)]
pub struct Host {
    broker: Broker,
}

impl Host {
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }

    /// Build the broker a config describes
    pub fn from_config(config: &BrokerConfig, statics: Option<Arc<StaticFactories>>) -> HostResult<Self> {
        Ok(Self::new(Broker::from_config(config, statics)?))
    }

    /// Load a config file, install logging at its level and build the broker
    pub fn load(path: &Path) -> HostResult<Self> {
        let config = BrokerConfig::load(path)?;
        init_logging(&config.log_level);
        tracing::info!(
            broker = %config.name,
            providers = config.providers.len(),
            "Starting CMPI host"
        );
        Self::from_config(&config, None)
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Run one request and return its result as JSON
    #[instrument(skip_all)]
    pub fn execute(&self, call: &HostCall) -> HostResult<Json> {
        let req = call.context();
        let broker = &self.broker;
        let json = match &call.request {
            HostRequest::EnumerateInstanceNames { path } => {
                serde_json::to_value(broker.enumerate_instance_names(&req, &path.to_path()?)?)?
            }
            HostRequest::EnumerateInstances { path, properties } => {
                serde_json::to_value(broker.enumerate_instances(&req, &path.to_path()?, properties.as_deref())?)?
            }
            HostRequest::GetInstance { path, properties } => {
                serde_json::to_value(broker.get_instance(&req, &path.to_path()?, properties.as_deref())?)?
            }
            HostRequest::CreateInstance { path, properties } => {
                let instance = json_to_instance(path.to_path()?, properties)?;
                serde_json::to_value(broker.create_instance(&req, &instance)?)?
            }
            HostRequest::ModifyInstance {
                path,
                properties,
                property_list,
            } => {
                let instance = json_to_instance(path.to_path()?, properties)?;
                broker.modify_instance(&req, &instance, property_list.as_deref())?;
                Json::Null
            }
            HostRequest::DeleteInstance { path } => {
                broker.delete_instance(&req, &path.to_path()?)?;
                Json::Null
            }
            HostRequest::ExecQuery { path, query, language } => {
                serde_json::to_value(broker.exec_query(&req, &path.to_path()?, query, language)?)?
            }
            HostRequest::Associators {
                path,
                filter,
                properties,
            } => serde_json::to_value(broker.associators(&req, &path.to_path()?, filter, properties.as_deref())?)?,
            HostRequest::AssociatorNames { path, filter } => {
                serde_json::to_value(broker.associator_names(&req, &path.to_path()?, filter)?)?
            }
            HostRequest::References {
                path,
                result_class,
                role,
                properties,
            } => serde_json::to_value(broker.references(
                &req,
                &path.to_path()?,
                result_class.as_deref(),
                role.as_deref(),
                properties.as_deref(),
            )?)?,
            HostRequest::ReferenceNames {
                path,
                result_class,
                role,
            } => serde_json::to_value(broker.reference_names(
                &req,
                &path.to_path()?,
                result_class.as_deref(),
                role.as_deref(),
            )?)?,
            HostRequest::InvokeMethod { path, method, args } => {
                let in_args = json_to_named(args)?;
                serde_json::to_value(broker.invoke_method(&req, &path.to_path()?, method, &in_args)?)?
            }
            HostRequest::GetProperty { path, name } => {
                serde_json::to_value(broker.get_property(&req, &path.to_path()?, name)?)?
            }
            HostRequest::SetProperty {
                path,
                name,
                value,
                origin,
            } => {
                let data = Data::new(json_to_value(value)?);
                broker.set_property(&req, &path.to_path()?, name, &data, origin.as_deref())?;
                Json::Null
            }
        };
        Ok(json)
    }

    /// Parse, run and render one request; failures become error replies
    pub fn execute_json(&self, request: &str) -> String {
        let result = serde_json::from_str::<HostCall>(request)
            .map_err(HostError::from)
            .and_then(|call| self.execute(&call));
        render(&Reply::from(result))
    }

    /// Queued indications as a JSON array, oldest first
    pub fn drain_indications_json(&self) -> String {
        let events: Vec<IndicationEvent> = self.broker.drain_indications();
        render(&events)
    }
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!("Failed to render reply: {}", e);
        format!(r#"{{"error":{{"rc":{},"message":"unrenderable reply"}}}}"#, cmpi_core::sdk::CMPI_RC_ERR_FAILED)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use cmpi_core::engine::StaticFactories;
    use cmpi_core::handles::{BrokerHandle, ContextRef, InstanceRef, ObjectPathRef, ResultRef};
    use cmpi_core::provider::{InstanceProvider, Provider, ProviderExport};
    use cmpi_core::{CmpiError, CmpiProvider, CmpiResult, InstanceData, ObjectPathData, ProviderConfig};

    use super::*;

    #[derive(CmpiProvider)]
    #[cmpi(name = "HostSensor", instance)]
    struct Sensors;

    impl Provider for Sensors {
        fn initialize(_broker: BrokerHandle, _ctx: &ContextRef) -> CmpiResult<Self> {
            Ok(Sensors)
        }
    }

    impl InstanceProvider for Sensors {
        fn enumerate_instances(
            &self,
            _ctx: &ContextRef,
            rslt: &ResultRef,
            class_path: &ObjectPathRef,
            properties: Option<&[String]>,
        ) -> CmpiResult<()> {
            let ns = class_path.namespace()?;
            let sensor = InstanceData::new(ObjectPathData::new(&ns, "Host_Sensor").with_key("Name", "cpu0"))
                .with_property("Name", "cpu0")
                .with_property("Celsius", 41u16);
            rslt.return_instance_data(&sensor.projected(properties))?;
            rslt.return_done()
        }

        fn create_instance(
            &self,
            _ctx: &ContextRef,
            _rslt: &ResultRef,
            _class_path: &ObjectPathRef,
            instance: &InstanceRef,
        ) -> CmpiResult<()> {
            let name = instance.property("Name")?;
            Err(CmpiError::failed(format!("read-only sensor {name}")))
        }
    }

    fn host() -> Host {
        let mut table = StaticFactories::default();
        Sensors::register_static(&mut table);
        let config = BrokerConfig {
            providers: vec![ProviderConfig {
                name: "HostSensor".to_string(),
                module: None,
                namespaces: vec!["root/test".to_string()],
                classes: vec!["Host_Sensor".to_string()],
                kinds: vec!["instance".to_string()],
            }],
            ..BrokerConfig::default()
        };
        Host::from_config(&config, Some(Arc::new(table))).unwrap()
    }

    fn run(host: &Host, request: serde_json::Value) -> serde_json::Value {
        serde_json::from_str(&host.execute_json(&request.to_string())).unwrap()
    }

    #[test]
    fn test_enumerate_as_json() {
        let host = host();
        let reply = run(
            &host,
            json!({
                "request": {
                    "op": "enumerate_instances",
                    "path": { "namespace": "root/test", "class": "Host_Sensor" }
                }
            }),
        );
        let sensors = reply["ok"].as_array().unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0]["path"]["class_name"], "Host_Sensor");
        assert_eq!(sensors[0]["path"]["namespace"], "root/test");
    }

    #[test]
    fn test_errors_as_json() {
        let host = host();

        let reply = run(
            &host,
            json!({
                "request": {
                    "op": "create_instance",
                    "path": { "namespace": "root/test", "class": "Host_Sensor", "keys": { "Name": "gpu0" } },
                    "properties": { "Name": "gpu0" }
                }
            }),
        );
        assert_eq!(reply["error"]["rc"], cmpi_core::sdk::CMPI_RC_ERR_FAILED);
        assert!(reply["error"]["message"].as_str().unwrap().starts_with("read-only sensor"));

        let reply = run(
            &host,
            json!({
                "request": {
                    "op": "delete_instance",
                    "path": { "namespace": "root/test", "class": "Host_Sensor", "keys": { "Name": "cpu0" } }
                }
            }),
        );
        assert_eq!(reply["error"]["rc"], cmpi_core::sdk::CMPI_RC_ERR_NOT_SUPPORTED);

        let reply: serde_json::Value = serde_json::from_str(&host.execute_json("{ not json")).unwrap();
        assert_eq!(reply["error"]["rc"], cmpi_core::sdk::CMPI_RC_ERR_INVALID_PARAMETER);

        assert_eq!(host.drain_indications_json(), "[]");
    }
}
