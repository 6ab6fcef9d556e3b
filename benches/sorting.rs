//! Benchmarks for restriction hierarchy sorting.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use conref::concept::{Concept, ExistRestriction};
use conref::context::OntologyContext;
use conref::hierarchy::{ConceptGraph, HierarchySorter};
use conref::ontology::Ontology;
use conref::oracle::ToldReasoner;

/// `C0 ⊒ C1 ⊒ … ⊒ Cn` with one `∃R.Ci` per link.
fn chain(len: usize) -> (Ontology, Vec<ExistRestriction>) {
    let mut onto = Ontology::new();
    for i in 1..len {
        onto.add_subclass(Concept::atomic(format!("C{i}")), Concept::atomic(format!("C{}", i - 1)));
    }
    let restrictions = (0..len)
        .rev()
        .map(|i| ExistRestriction::new("R", Concept::atomic(format!("C{i}"))))
        .collect();
    (onto, restrictions)
}

fn bench_sort(c: &mut Criterion, name: &str, len: usize, bulk_threshold: usize) {
    let (onto, restrictions) = chain(len);
    let reasoner = ToldReasoner::new(&onto);
    let ctx = OntologyContext::new(&onto, &reasoner);
    let sorter = HierarchySorter::new(&ctx).with_bulk_threshold(bulk_threshold);

    c.bench_function(name, |bench| {
        bench.iter(|| {
            let mut graph = ConceptGraph::new();
            for restriction in &restrictions {
                graph.insert(restriction.clone());
            }
            sorter.sort(&mut graph).unwrap();
            black_box(graph.roots().len())
        })
    });
}

fn bench_pairwise(c: &mut Criterion) {
    bench_sort(c, "pairwise_chain_40", 40, usize::MAX);
}

fn bench_bulk(c: &mut Criterion) {
    bench_sort(c, "bulk_chain_40", 40, 2);
}

criterion_group!(benches, bench_pairwise, bench_bulk);
criterion_main!(benches);
