use loom::sync::Arc;
use loom::sync::atomic::AtomicUsize;
use loom::sync::atomic::Ordering;
use loom::thread;

use tether::agent::ReplyFuture;
use tether::agent::ReplyPromise;
use tether::agent::reply_channel;
use tether::proto::Message;
use tether::proto::MessageKind;

#[test]
fn reply_delivered_exactly_once() {
  loom::model(|| {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();

    let seen: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    let counter: Arc<AtomicUsize> = Arc::clone(&seen);

    let completer = thread::spawn(move || {
      promise.complete(Message::ack());
    });

    let observer = thread::spawn(move || {
      future.on_reply(move |message| {
        assert_eq!(message.kind(), MessageKind::Ack);
        counter.fetch_add(1, Ordering::SeqCst);
      });
    });

    completer.join().unwrap();
    observer.join().unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1, "reply delivered twice or lost");
  });
}
