//! MIB data served by the test agent.

use snmp_lite::{Oid, Value, oid};
use std::collections::BTreeMap;

const SYSTEM: [u32; 7] = [1, 3, 6, 1, 2, 1, 1];
const IF_ENTRY: [u32; 9] = [1, 3, 6, 1, 2, 1, 2, 2, 1];

fn system_leaf(column: u32) -> Oid {
    Oid::from_slice(&SYSTEM).child(column).child(0)
}

/// The seven scalars of the system group.
pub fn system_mib() -> BTreeMap<Oid, Value> {
    BTreeMap::from([
        (sys_descr(), Value::from("Test SNMP Agent")),
        (
            system_leaf(2),
            Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 99999)),
        ),
        (sys_uptime(), Value::TimeTicks(123_456)),
        (system_leaf(4), Value::from("noc@example.net")),
        (sys_name(), Value::from("lab-agent")),
        (system_leaf(6), Value::from("rack 4, row B")),
        (system_leaf(7), Value::Integer(72)),
    ])
}

/// `ifNumber.0` plus `rows` rows of eight ifTable columns: `1 + 8 * rows`
/// entries.
pub fn interface_table(rows: u32) -> BTreeMap<Oid, Value> {
    let mut mib = BTreeMap::from([(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(rows as i32))]);

    for row in 1..=rows {
        let columns = [
            Value::Integer(row as i32),
            Value::from(format!("ge-0/0/{}", row - 1).as_str()),
            Value::Integer(6),
            Value::Integer(9000),
            Value::Gauge32(1_000_000_000),
            Value::OctetString(vec![0x02, 0x00, 0x5e, 0x10, 0x00, row as u8].into()),
            Value::Integer(1),
            Value::Integer(if row % 2 == 0 { 2 } else { 1 }),
        ];
        for (column, value) in (1u32..).zip(columns) {
            mib.insert(Oid::from_slice(&IF_ENTRY).child(column).child(row), value);
        }
    }

    mib
}

pub fn combined(parts: impl IntoIterator<Item = BTreeMap<Oid, Value>>) -> BTreeMap<Oid, Value> {
    parts.into_iter().flatten().collect()
}

pub fn sys_descr() -> Oid {
    system_leaf(1)
}

pub fn sys_uptime() -> Oid {
    system_leaf(3)
}

pub fn sys_name() -> Oid {
    system_leaf(5)
}

pub fn system_subtree() -> Oid {
    Oid::from_slice(&SYSTEM)
}

pub fn interfaces_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2)
}

/// Absent from every fixture.
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 99, 99, 99, 0)
}
