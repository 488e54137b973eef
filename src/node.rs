//! Typed scalar nodes.
//!
//! A [`ScalarNode`] pairs an OID with the value kind it is declared to hold,
//! so reads come back as native Rust values and writes cannot carry the wrong
//! kind. The kind is checked exactly; a `Gauge32` reply to a node declared
//! `Counter32` is an [`Error::TypeMismatch`], not a conversion.
//!
//! ```rust,no_run
//! use snmp_lite::node::{self, ScalarNode, get_typed, set_typed};
//! use snmp_lite::{Auth, Client, oid};
//!
//! # async fn example() -> snmp_lite::Result<()> {
//! let sys_name: ScalarNode<node::OctetString> = ScalarNode::new(
//!     "sysName",
//!     "An administratively-assigned name for this managed node.",
//!     oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
//! );
//!
//! let client = Client::builder("192.168.1.1:161", Auth::v2c("private"))
//!     .connect()
//!     .await?;
//!
//! let current = get_typed(&client, &sys_name).await?;
//! println!("{} = {:?}", current.node.name, current.value);
//!
//! set_typed(&client, sys_name.value("core-sw1".into())).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::transport::Transport;
use crate::value::{Value, ValueType};
use crate::varbind::VarBind;

mod sealed {
    pub trait Sealed {}
}

/// A value kind usable by typed nodes.
///
/// Implemented only by the marker types in this module.
pub trait Kind: sealed::Sealed {
    /// Native payload type.
    type Native: Clone + fmt::Debug + PartialEq;

    /// The kind this marker stands for.
    const TYPE: ValueType;

    /// Wrap a native payload.
    fn into_value(native: Self::Native) -> Value;

    /// Unwrap a value of exactly this kind.
    fn from_value(value: Value) -> Option<Self::Native>;
}

macro_rules! kinds {
    ($($(#[$doc:meta])* $marker:ident => $native:ty;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $marker;

            impl sealed::Sealed for $marker {}

            impl Kind for $marker {
                type Native = $native;
                const TYPE: ValueType = ValueType::$marker;

                fn into_value(native: $native) -> Value {
                    Value::$marker(native)
                }

                fn from_value(value: Value) -> Option<$native> {
                    match value {
                        Value::$marker(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

kinds! {
    /// BOOLEAN
    Boolean => bool;
    /// INTEGER
    Integer => i32;
    /// BIT STRING
    BitString => Bytes;
    /// OCTET STRING
    OctetString => Bytes;
    /// OBJECT IDENTIFIER
    ObjectIdentifier => Oid;
    /// ObjectDescriptor
    ObjectDescription => Bytes;
    /// IpAddress
    IpAddress => [u8; 4];
    /// Counter32
    Counter32 => u32;
    /// Gauge32
    Gauge32 => u32;
    /// TimeTicks, in hundredths of a second
    TimeTicks => u32;
    /// Opaque
    Opaque => Bytes;
    /// NsapAddress
    NsapAddress => Bytes;
    /// Counter64
    Counter64 => u64;
    /// UInteger32
    UInteger32 => u32;
    /// Opaque float
    OpaqueFloat => f32;
    /// Opaque double
    OpaqueDouble => f64;
}

/// NULL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Null;

impl sealed::Sealed for Null {}

impl Kind for Null {
    type Native = ();
    const TYPE: ValueType = ValueType::Null;

    fn into_value(_: ()) -> Value {
        Value::Null
    }

    fn from_value(value: Value) -> Option<()> {
        matches!(value, Value::Null).then_some(())
    }
}

/// A scalar object declared to hold values of kind `K`.
pub struct ScalarNode<K: Kind> {
    /// Object name, e.g. "sysName"
    pub name: &'static str,
    /// Free text description
    pub description: &'static str,
    /// Instance OID
    pub oid: Oid,
    kind: PhantomData<K>,
}

impl<K: Kind> ScalarNode<K> {
    /// Declare a node.
    pub fn new(name: &'static str, description: &'static str, oid: Oid) -> Self {
        Self {
            name,
            description,
            oid,
            kind: PhantomData,
        }
    }

    /// The declared kind.
    pub fn kind(&self) -> ValueType {
        K::TYPE
    }

    /// Pair this node with a value, ready for [`set_typed`].
    pub fn value(&self, value: K::Native) -> ScalarNodeValue<K> {
        ScalarNodeValue {
            node: self.clone(),
            value,
        }
    }
}

impl<K: Kind> Clone for ScalarNode<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            description: self.description,
            oid: self.oid.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: Kind> fmt::Debug for ScalarNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarNode")
            .field("name", &self.name)
            .field("oid", &self.oid)
            .field("kind", &K::TYPE)
            .finish()
    }
}

/// A native value bound to its node.
pub struct ScalarNodeValue<K: Kind> {
    /// The node the value belongs to.
    pub node: ScalarNode<K>,
    /// The value.
    pub value: K::Native,
}

impl<K: Kind> ScalarNodeValue<K> {
    /// Convert to an untyped binding.
    pub fn to_varbind(&self) -> VarBind {
        VarBind::new(self.node.oid.clone(), K::into_value(self.value.clone()))
    }
}

impl<K: Kind> Clone for ScalarNodeValue<K> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            value: self.value.clone(),
        }
    }
}

impl<K: Kind> fmt::Debug for ScalarNodeValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarNodeValue")
            .field("node", &self.node)
            .field("value", &self.value)
            .finish()
    }
}

/// Check a reply against `node` and unwrap its native payload.
fn typed_from<K: Kind>(node: &ScalarNode<K>, varbind: VarBind) -> Result<ScalarNodeValue<K>> {
    K::TYPE.validate_value(&varbind.value)?;
    let actual = varbind.value.value_type().name();
    let value = K::from_value(varbind.value).ok_or(Error::TypeMismatch {
        expected: K::TYPE.name(),
        actual,
    })?;
    Ok(ScalarNodeValue {
        node: node.clone(),
        value,
    })
}

/// GET `node` and return its value as the declared native type.
///
/// Fails with [`Error::TypeMismatch`] when the agent answers with another kind.
pub async fn get_typed<T, K>(client: &Client<T>, node: &ScalarNode<K>) -> Result<ScalarNodeValue<K>>
where
    T: Transport,
    K: Kind,
{
    let varbind = client.get(&node.oid).await?;
    typed_from(node, varbind).inspect_err(|e| {
        tracing::debug!(target: "snmp_lite::client", { snmp.oid = %node.oid, node = node.name, error = %e }, "typed GET kind mismatch");
    })
}

/// SET `value` on its node.
pub async fn set_typed<T, K>(client: &Client<T>, value: ScalarNodeValue<K>) -> Result<()>
where
    T: Transport,
    K: Kind,
{
    client.set(value.to_varbind()).await.map(|_| ())
}
