use loom::sync::Arc;
use loom::thread;

use tether::types::GlobalId;
use tether::types::IdAllocator;
use tether::types::WorkerId;

#[test]
fn concurrent_mint_never_collides() {
  loom::model(|| {
    let ids: Arc<IdAllocator> = Arc::new(IdAllocator::new(WorkerId::from_bits(1)));

    let handles: Vec<_> = (0..2)
      .map(|_| {
        let ids: Arc<IdAllocator> = Arc::clone(&ids);

        thread::spawn(move || {
          let first: GlobalId = ids.next_id();
          let other: GlobalId = ids.next_id();

          assert!(first.local() < other.local(), "counter went backwards");

          (first, other)
        })
      })
      .collect();

    let mut all: Vec<GlobalId> = Vec::new();

    for handle in handles {
      let (first, other): (GlobalId, GlobalId) = handle.join().unwrap();

      all.push(first);
      all.push(other);
    }

    all.sort();
    all.dedup();

    assert_eq!(all.len(), 4, "identifier minted twice");
  });
}
