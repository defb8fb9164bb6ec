//! Method and service descriptors.
//!
//! Descriptors are built once, when a service type is defined, and are never
//! mutated afterwards. Calls share them through `Arc` so lookups need no
//! locking.

use indexmap::map::Entry;
use indexmap::IndexMap;
use schemars::JsonSchema;
use std::sync::Arc;

use crate::schema::{MessageSchema, SchemaRef};
use crate::{CodecError, RegistryError};

/// One RPC method and the schemas of its request and response.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    request_schema: SchemaRef,
    response_schema: SchemaRef,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, request_schema: SchemaRef, response_schema: SchemaRef) -> Self {
        MethodDescriptor {
            name: name.into(),
            request_schema,
            response_schema,
        }
    }

    /// A method whose request and response schemas are derived from Rust types.
    pub fn typed<Req, Resp>(name: impl Into<String>) -> Result<Self, CodecError>
    where
        Req: JsonSchema,
        Resp: JsonSchema,
    {
        Ok(Self::new(
            name,
            Arc::new(MessageSchema::of::<Req>()?),
            Arc::new(MessageSchema::of::<Resp>()?),
        ))
    }

    /// A method that accepts and returns any JSON value.
    pub fn untyped(name: impl Into<String>) -> Self {
        let name = name.into();
        let request = Arc::new(MessageSchema::any(format!("{}Request", name)));
        let response = Arc::new(MessageSchema::any(format!("{}Response", name)));
        Self::new(name, request, response)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_schema(&self) -> &SchemaRef {
        &self.request_schema
    }

    pub fn response_schema(&self) -> &SchemaRef {
        &self.response_schema
    }
}

/// A named set of methods with unique names, in registration order.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    methods: IndexMap<String, Arc<MethodDescriptor>>,
}

impl ServiceDescriptor {
    pub fn builder(name: impl Into<String>) -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Build the registry, rejecting duplicate method names.
    pub fn from_methods<I>(name: impl Into<String>, methods: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = MethodDescriptor>,
    {
        let name = name.into();
        let mut table = IndexMap::new();

        for method in methods {
            match table.entry(method.name().to_string()) {
                Entry::Occupied(entry) => {
                    return Err(RegistryError::DuplicateMethod {
                        service: name,
                        method: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(method));
                }
            }
        }

        Ok(ServiceDescriptor {
            name,
            methods: table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_by_name(&self, name: &str) -> Result<&Arc<MethodDescriptor>, RegistryError> {
        self.methods
            .get(name)
            .ok_or_else(|| RegistryError::UnknownMethod {
                service: self.name.clone(),
                method: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
    name: String,
    methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptorBuilder {
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn build(self) -> Result<ServiceDescriptor, RegistryError> {
        ServiceDescriptor::from_methods(self.name, self.methods)
    }
}
