use crate::RuleContext;
use std::rc::Rc;

impl RuleContext {
    /// The outermost context; prediction started from here sees no surrounding rules.
    pub fn empty() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            invoking_state: None,
        })
    }

    /// A context for a rule entered through transition 0 of `invoking_state`.
    pub fn child(parent: &Rc<RuleContext>, invoking_state: usize) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            invoking_state: Some(invoking_state),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.invoking_state.is_none()
    }

    /// The number of invocation links above this context.
    pub fn depth(&self) -> usize {
        let mut n = 0;
        let mut current = self;
        while let Some(parent) = &current.parent {
            n += 1;
            current = parent;
        }
        n
    }
}
