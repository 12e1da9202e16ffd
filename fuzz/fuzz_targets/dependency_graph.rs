#![no_main]

//! Builds arbitrary dependency graphs over a fixed set of node types and
//! checks that resolution either succeeds or fails with a wiring error,
//! never panics, hangs or overflows the stack.

use ferrous_container::{DiError, Lifetime, ResolverCore, ServiceCollection, ServiceType};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const NODES: usize = 4;

struct Node<const N: usize>;

fn node_type(index: usize) -> ServiceType {
    match index % NODES {
        0 => ServiceType::of::<Node<0>>(),
        1 => ServiceType::of::<Node<1>>(),
        2 => ServiceType::of::<Node<2>>(),
        _ => ServiceType::of::<Node<3>>(),
    }
}

fn lifetime(byte: u8) -> Lifetime {
    match byte % 3 {
        0 => Lifetime::Singleton,
        1 => Lifetime::Scoped,
        _ => Lifetime::Transient,
    }
}

fn register<const N: usize>(services: &mut ServiceCollection, byte: u8, edges: Vec<ServiceType>) {
    services.add_factory::<Node<N>, _>(lifetime(byte), move |r| {
        for edge in &edges {
            r.resolve_required(edge)?;
        }
        Ok(Arc::new(Node::<N>))
    });
}

fuzz_target!(|data: &[u8]| {
    if data.len() < NODES {
        return;
    }

    let mut services = ServiceCollection::new();
    for (index, byte) in data.iter().take(NODES).enumerate() {
        let edges: Vec<ServiceType> = (0..NODES)
            .filter(|bit| byte & (0x10 << bit) != 0)
            .map(node_type)
            .collect();
        match index {
            0 => register::<0>(&mut services, *byte, edges),
            1 => register::<1>(&mut services, *byte, edges),
            2 => register::<2>(&mut services, *byte, edges),
            _ => register::<3>(&mut services, *byte, edges),
        }
    }

    let provider = services.build();
    let scope = provider.create_scope();
    for byte in &data[NODES..] {
        let target = node_type(*byte as usize);
        match scope.resolve_required(&target) {
            Ok(_)
            | Err(DiError::Circular(_))
            | Err(DiError::ScopedWithoutScope(_)) => {}
            Err(other) => panic!("unexpected resolution error: {}", other),
        }
    }
});
