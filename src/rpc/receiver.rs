/// Per-request observer and pipeline-stage state holder.
///
/// The dispatch loop calls `on_progress`/`on_next` any number of times,
/// then exactly one of `on_completed` or `on_error`, unless the request
/// is cancelled first, in which case neither fires and the receiver is
/// dropped. The terminal callbacks take `self` by value:
/// a receiver cannot be notified twice, and a chaining stage hands its
/// accumulated state to the next stage by consuming itself.
pub trait Receiver: Send + 'static {
    type Item;

    /// Fraction in [0, 1]; 0 means "just started", 1 "most likely final".
    fn on_progress(&mut self, _fraction: f64) {}

    fn on_next(&mut self, value: Self::Item);

    fn on_completed(self);

    fn on_error(self, message: String);
}
