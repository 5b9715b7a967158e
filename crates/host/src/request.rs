//! JSON request format
//!
//! ```json
//! {
//!   "principal": "admin",
//!   "request": {
//!     "op": "invoke_method",
//!     "path": { "namespace": "root/cimv2", "class": "ACME_Fan", "keys": { "Id": 1 } },
//!     "method": "SetSpeed",
//!     "args": { "Rpm": 1200 }
//!   }
//! }
//! ```
//!
//! JSON scalars map to CIM values as booleans, `sint64` (or `uint64` when
//! out of range), `real64` and `string`. Arrays must hold a single scalar type.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

use cmpi_core::sdk::CMPI_string;
use cmpi_core::{
    ArrayData, AssocFilter, Data, InstanceData, InvocationFlags, NamedData, ObjectPathData, RequestContext,
    Value,
};

use crate::error::{HostError, HostResult};

/// Property or argument values keyed by name
pub type JsonMap = BTreeMap<String, Json>;

/// One request plus the caller identity it runs under
#[derive(Debug, Clone, Deserialize)]
pub struct HostCall {
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub local_only: bool,
    #[serde(default)]
    pub include_qualifiers: bool,
    pub request: HostRequest,
}

impl HostCall {
    pub fn new(request: HostRequest) -> Self {
        Self {
            principal: None,
            role: None,
            local_only: false,
            include_qualifiers: false,
            request,
        }
    }

    pub fn context(&self) -> RequestContext {
        let mut flags = InvocationFlags::empty();
        flags.set(InvocationFlags::LOCAL_ONLY, self.local_only);
        flags.set(InvocationFlags::INCLUDE_QUALIFIERS, self.include_qualifiers);
        RequestContext {
            principal: self.principal.clone(),
            role: self.role.clone(),
            flags,
            ..RequestContext::default()
        }
    }
}

/// Object path in a request
#[derive(Debug, Clone, Deserialize)]
pub struct PathSpec {
    pub namespace: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub keys: JsonMap,
}

impl PathSpec {
    pub fn to_path(&self) -> HostResult<ObjectPathData> {
        let mut path = ObjectPathData::new(&self.namespace, &self.class_name);
        for (name, value) in &self.keys {
            path.add_key(name, Data::new(json_to_value(value)?))?;
        }
        Ok(path)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostRequest {
    EnumerateInstanceNames {
        path: PathSpec,
    },
    EnumerateInstances {
        path: PathSpec,
        #[serde(default)]
        properties: Option<Vec<String>>,
    },
    GetInstance {
        path: PathSpec,
        #[serde(default)]
        properties: Option<Vec<String>>,
    },
    CreateInstance {
        path: PathSpec,
        #[serde(default)]
        properties: JsonMap,
    },
    ModifyInstance {
        path: PathSpec,
        #[serde(default)]
        properties: JsonMap,
        /// Properties to update; all of them when absent
        #[serde(default)]
        property_list: Option<Vec<String>>,
    },
    DeleteInstance {
        path: PathSpec,
    },
    ExecQuery {
        path: PathSpec,
        query: String,
        language: String,
    },
    Associators {
        path: PathSpec,
        #[serde(default)]
        filter: AssocFilter,
        #[serde(default)]
        properties: Option<Vec<String>>,
    },
    AssociatorNames {
        path: PathSpec,
        #[serde(default)]
        filter: AssocFilter,
    },
    References {
        path: PathSpec,
        #[serde(default)]
        result_class: Option<String>,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        properties: Option<Vec<String>>,
    },
    ReferenceNames {
        path: PathSpec,
        #[serde(default)]
        result_class: Option<String>,
        #[serde(default)]
        role: Option<String>,
    },
    InvokeMethod {
        path: PathSpec,
        method: String,
        #[serde(default)]
        args: JsonMap,
    },
    GetProperty {
        path: PathSpec,
        name: String,
    },
    SetProperty {
        path: PathSpec,
        name: String,
        value: Json,
        #[serde(default)]
        origin: Option<String>,
    },
}

/// Convert a JSON scalar or scalar array to a CIM value
pub fn json_to_value(json: &Json) -> HostResult<Value> {
    match json {
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Sint64(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Uint64(u))
            } else {
                n.as_f64()
                    .map(Value::Real64)
                    .ok_or_else(|| HostError::invalid(format!("unrepresentable number {n}")))
            }
        }
        Json::Array(items) => {
            let values = items.iter().map(json_to_value).collect::<HostResult<Vec<_>>>()?;
            let ty = values.first().map(Value::type_tag).unwrap_or(CMPI_string);
            if values.iter().any(|v| v.type_tag() != ty || matches!(v, Value::Array(_))) {
                return Err(HostError::invalid("arrays must hold one scalar type"));
            }
            Ok(Value::Array(ArrayData::from_values(ty, values)))
        }
        Json::Null => Err(HostError::invalid("null is not a value")),
        Json::Object(_) => Err(HostError::invalid("embedded objects are not supported")),
    }
}

/// Named values from a JSON object
pub fn json_to_named(map: &JsonMap) -> HostResult<NamedData> {
    let mut named = NamedData::new();
    for (name, value) in map {
        named.set(name, Data::new(json_to_value(value)?));
    }
    Ok(named)
}

/// Instance at `path` holding `properties`
pub fn json_to_instance(path: ObjectPathData, properties: &JsonMap) -> HostResult<InstanceData> {
    let mut instance = InstanceData::new(path);
    for (name, value) in properties {
        instance.set_property(name, Data::new(json_to_value(value)?), None);
    }
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmpi_core::sdk::{CMPI_sint64, CMPI_uint64};
    use serde_json::json;

    #[test]
    fn test_parse_call() {
        let call: HostCall = serde_json::from_value(json!({
            "principal": "admin",
            "local_only": true,
            "request": {
                "op": "get_instance",
                "path": { "namespace": "root/cimv2", "class": "ACME_Fan", "keys": { "Id": 3 } },
                "properties": ["Speed"]
            }
        }))
        .unwrap();

        let ctx = call.context();
        assert_eq!(ctx.principal.as_deref(), Some("admin"));
        assert!(ctx.flags.contains(InvocationFlags::LOCAL_ONLY));

        let HostRequest::GetInstance { path, properties } = &call.request else {
            panic!("wrong op: {:?}", call.request);
        };
        assert_eq!(properties.as_deref(), Some(&["Speed".to_string()][..]));
        let path = path.to_path().unwrap();
        assert_eq!(path.class_name, "ACME_Fan");
        assert_eq!(path.key("Id").and_then(|d| d.value()), Some(&Value::Sint64(3)));
    }

    #[test]
    fn test_association_filter_defaults() {
        let req: HostRequest = serde_json::from_value(json!({
            "op": "associator_names",
            "path": { "namespace": "root/cimv2", "class": "ACME_Fan" },
            "filter": { "assoc_class": "ACME_FanInRack" }
        }))
        .unwrap();
        let HostRequest::AssociatorNames { filter, .. } = req else {
            panic!("wrong op");
        };
        assert_eq!(filter.assoc_class.as_deref(), Some("ACME_FanInRack"));
        assert!(filter.role.is_none());
    }

    #[test]
    fn test_json_values() {
        assert_eq!(json_to_value(&json!(true)).unwrap(), Value::Boolean(true));
        assert_eq!(json_to_value(&json!(-4)).unwrap().type_tag(), CMPI_sint64);
        assert_eq!(json_to_value(&json!(u64::MAX)).unwrap().type_tag(), CMPI_uint64);
        assert_eq!(json_to_value(&json!(1.5)).unwrap(), Value::Real64(1.5));

        let Value::Array(array) = json_to_value(&json!(["a", "b"])).unwrap() else {
            panic!("expected array");
        };
        assert_eq!(array.len(), 2);
        assert_eq!(array.element_type, CMPI_string);

        assert!(json_to_value(&json!([1, "a"])).is_err());
        assert!(json_to_value(&json!(null)).is_err());
        assert!(json_to_value(&json!({ "a": 1 })).is_err());
    }

    #[test]
    fn test_array_key_rejected() {
        let path = PathSpec {
            namespace: "root/cimv2".to_string(),
            class_name: "ACME_Fan".to_string(),
            keys: [("Ids".to_string(), json!([1, 2]))].into_iter().collect(),
        };
        assert!(matches!(path.to_path(), Err(HostError::Cmpi(_))));
    }
}
