//! Counter application with two components sharing one key

use keyed_state::{use_global_state, KeyedStore, RenderScope, Setter};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct CounterState {
    count: i32,
    step: i32,
    history: Vec<i32>,
}

impl CounterState {
    fn new() -> Self {
        Self {
            count: 0,
            step: 1,
            history: vec![0],
        }
    }

    fn increment(&self) -> Self {
        let count = self.count + self.step;
        self.with_count(count)
    }

    fn decrement(&self) -> Self {
        let count = self.count - self.step;
        self.with_count(count)
    }

    fn reset(&self) -> Self {
        self.with_count(0)
    }

    fn with_count(&self, count: i32) -> Self {
        let mut history = self.history.clone();
        history.push(count);
        Self {
            count,
            step: self.step,
            history,
        }
    }
}

/// Renders the current count and hands back the setter, like a button bar would.
fn counter_view(
    scope: &mut RenderScope,
    store: &KeyedStore<CounterState>,
) -> Setter<CounterState> {
    scope.render(|cx| {
        let (state, set_state) = use_global_state(cx, store, "counter", CounterState::new());
        println!("   [Counter] count = {} (step {})", state.count, state.step);
        set_state
    })
}

fn history_view(scope: &mut RenderScope, store: &KeyedStore<CounterState>) {
    scope.render(|cx| {
        // A different initial value here is ignored: the counter view got there first.
        let (state, _) = use_global_state(cx, store, "counter", CounterState::new().reset());
        println!("   [History] {:?}", state.history);
    });
}

fn flush(
    counter: &mut RenderScope,
    history: &mut RenderScope,
    store: &KeyedStore<CounterState>,
) {
    if counter.needs_render() {
        counter_view(counter, store);
    }
    if history.needs_render() {
        history_view(history, store);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Counter Application ===\n");

    let store = KeyedStore::new();
    let mut counter = RenderScope::new();
    let mut history = RenderScope::new();

    println!("1. Mounting components");
    let set_state = counter_view(&mut counter, &store);
    history_view(&mut history, &store);

    println!("\n2. Incrementing...");
    for _ in 0..3 {
        set_state.update(CounterState::increment);
        flush(&mut counter, &mut history, &store);
    }

    println!("\n3. Changing step size to 5");
    set_state.update(|state| CounterState {
        step: 5,
        ..state.clone()
    });
    flush(&mut counter, &mut history, &store);

    println!("\n4. Decrementing...");
    set_state.update(CounterState::decrement);
    flush(&mut counter, &mut history, &store);

    println!("\n5. Unmounting history view, then resetting");
    history.unmount();
    set_state.update(CounterState::reset);
    flush(&mut counter, &mut history, &store);

    println!(
        "\nRenders: counter {}, history {}",
        counter.render_count(),
        history.render_count()
    );
}
