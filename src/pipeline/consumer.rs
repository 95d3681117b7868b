/// Matched pairs first, then leftovers of `A` and of `B` in input order.
pub trait MatchConsumer<A, B> {
    fn matched(&mut self, _a: &A, _b: &B) {}

    fn unmatched_a(&mut self, _a: &A) {}

    fn unmatched_b(&mut self, _b: &B) {}

    fn and_then<C>(self, next: C) -> Chain<Self, C>
    where
        Self: Sized,
        C: MatchConsumer<A, B>,
    {
        chain(self, next)
    }
}

impl<A, B> MatchConsumer<A, B> for () {}

impl<A, B, C> MatchConsumer<A, B> for &mut C
where
    C: MatchConsumer<A, B> + ?Sized,
{
    fn matched(&mut self, a: &A, b: &B) {
        (**self).matched(a, b);
    }

    fn unmatched_a(&mut self, a: &A) {
        (**self).unmatched_a(a);
    }

    fn unmatched_b(&mut self, b: &B) {
        (**self).unmatched_b(b);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chain<F, S> {
    first: F,
    second: S,
}

impl<F, S> Chain<F, S> {
    pub fn into_inner(self) -> (F, S) {
        (self.first, self.second)
    }
}

pub fn chain<F, S>(first: F, second: S) -> Chain<F, S> {
    Chain { first, second }
}

impl<A, B, F, S> MatchConsumer<A, B> for Chain<F, S>
where
    F: MatchConsumer<A, B>,
    S: MatchConsumer<A, B>,
{
    fn matched(&mut self, a: &A, b: &B) {
        self.first.matched(a, b);
        self.second.matched(a, b);
    }

    fn unmatched_a(&mut self, a: &A) {
        self.first.unmatched_a(a);
        self.second.unmatched_a(a);
    }

    fn unmatched_b(&mut self, b: &B) {
        self.first.unmatched_b(b);
        self.second.unmatched_b(b);
    }
}

type PairHook<'a, A, B> = Box<dyn FnMut(&A, &B) + 'a>;
type SingleHook<'a, T> = Box<dyn FnMut(&T) + 'a>;

pub struct Callbacks<'a, A, B> {
    matched: Option<PairHook<'a, A, B>>,
    unmatched_a: Option<SingleHook<'a, A>>,
    unmatched_b: Option<SingleHook<'a, B>>,
}

impl<A, B> Default for Callbacks<'_, A, B> {
    fn default() -> Self {
        Self {
            matched: None,
            unmatched_a: None,
            unmatched_b: None,
        }
    }
}

impl<'a, A, B> Callbacks<'a, A, B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_matched(mut self, hook: impl FnMut(&A, &B) + 'a) -> Self {
        self.matched = Some(Box::new(hook));
        self
    }

    pub fn on_unmatched_a(mut self, hook: impl FnMut(&A) + 'a) -> Self {
        self.unmatched_a = Some(Box::new(hook));
        self
    }

    pub fn on_unmatched_b(mut self, hook: impl FnMut(&B) + 'a) -> Self {
        self.unmatched_b = Some(Box::new(hook));
        self
    }
}

impl<A, B> MatchConsumer<A, B> for Callbacks<'_, A, B> {
    fn matched(&mut self, a: &A, b: &B) {
        if let Some(hook) = self.matched.as_mut() {
            hook(a, b);
        }
    }

    fn unmatched_a(&mut self, a: &A) {
        if let Some(hook) = self.unmatched_a.as_mut() {
            hook(a);
        }
    }

    fn unmatched_b(&mut self, b: &B) {
        if let Some(hook) = self.unmatched_b.as_mut() {
            hook(b);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCollector<A, B> {
    pub matched: Vec<(A, B)>,
    pub unmatched_a: Vec<A>,
    pub unmatched_b: Vec<B>,
}

impl<A, B> Default for MatchCollector<A, B> {
    fn default() -> Self {
        Self {
            matched: Vec::new(),
            unmatched_a: Vec::new(),
            unmatched_b: Vec::new(),
        }
    }
}

impl<A, B> MatchCollector<A, B> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: Clone, B: Clone> MatchConsumer<A, B> for MatchCollector<A, B> {
    fn matched(&mut self, a: &A, b: &B) {
        self.matched.push((a.clone(), b.clone()));
    }

    fn unmatched_a(&mut self, a: &A) {
        self.unmatched_a.push(a.clone());
    }

    fn unmatched_b(&mut self, b: &B) {
        self.unmatched_b.push(b.clone());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounter {
    pub matched: usize,
    pub unmatched_a: usize,
    pub unmatched_b: usize,
}

impl<A, B> MatchConsumer<A, B> for MatchCounter {
    fn matched(&mut self, _a: &A, _b: &B) {
        self.matched += 1;
    }

    fn unmatched_a(&mut self, _a: &A) {
        self.unmatched_a += 1;
    }

    fn unmatched_b(&mut self, _b: &B) {
        self.unmatched_b += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<C: MatchConsumer<u32, char>>(consumer: &mut C) {
        consumer.matched(&1, &'x');
        consumer.matched(&2, &'y');
        consumer.unmatched_a(&3);
        consumer.unmatched_b(&'z');
    }

    #[test]
    fn chain_delivers_each_event_once_in_order() {
        let mut log = Vec::new();
        {
            let first = Callbacks::new()
                .on_matched(|a: &u32, b: &char| log.push(format!("m{a}{b}")));
            let mut counter = MatchCounter::default();
            let mut chained = first.and_then(&mut counter);
            drive(&mut chained);
            drop(chained);
            assert_eq!(
                counter,
                MatchCounter {
                    matched: 2,
                    unmatched_a: 1,
                    unmatched_b: 1,
                }
            );
        }
        assert_eq!(log, vec!["m1x".to_string(), "m2y".to_string()]);
    }

    #[test]
    fn collectors_compose_without_duplication() {
        let mut chained = chain(MatchCollector::new(), MatchCollector::new());
        drive(&mut chained);
        let (left, right) = chained.into_inner();
        assert_eq!(left, right);
        assert_eq!(left.matched, vec![(1, 'x'), (2, 'y')]);
        assert_eq!(left.unmatched_a, vec![3]);
        assert_eq!(left.unmatched_b, vec!['z']);
    }

    #[test]
    fn unit_consumer_ignores_events() {
        drive(&mut ());
    }
}
