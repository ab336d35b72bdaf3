use std::{
    cell::{Cell, RefCell, RefMut},
    rc::Rc,
};

use codec::{ParameterBlob, ParameterCodec};
use log::debug;
use machine_learning::Model;
use tensor::Tensor;

use crate::{Result, SchedulerErr};

struct Inner<M> {
    model: RefCell<M>,
    leased: Cell<bool>,
}

/// Single threaded owner of a model.
///
/// While a training session holds the model's lease, inference, binding and new sessions fail
/// with `SchedulerErr::State`. Clones share the same model.
pub struct SharedModel<M> {
    inner: Rc<Inner<M>>,
}

impl<M> Clone for SharedModel<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: Model> SharedModel<M> {
    pub fn new(model: M) -> Self {
        Self {
            inner: Rc::new(Inner {
                model: RefCell::new(model),
                leased: Cell::new(false),
            }),
        }
    }

    /// Whether a running session currently owns the model.
    pub fn is_training(&self) -> bool {
        self.inner.leased.get()
    }

    /// Runs inference, see `Model::predict`.
    pub fn predict(&self, x: &Tensor) -> Result<Tensor> {
        Ok(self.borrow("predict")?.predict(x)?)
    }

    /// Binds a decoded blob onto the model, all or nothing.
    pub fn bind(&self, blob: &ParameterBlob) -> Result<()> {
        let mut model = self.borrow("bind parameters")?;
        ParameterCodec::bind(&mut *model, blob)?;
        Ok(())
    }

    /// Snapshots the model's current parameters.
    pub fn snapshot(&self) -> Result<ParameterBlob> {
        let model = self.borrow("snapshot parameters")?;
        Ok(ParameterBlob::from_model(&*model)?)
    }

    /// Gives exclusive access to the model outside of a session.
    pub fn with_model<T>(&self, f: impl FnOnce(&mut M) -> T) -> Result<T> {
        let mut model = self.borrow("access the model")?;
        Ok(f(&mut model))
    }

    fn borrow(&self, op: &str) -> Result<RefMut<'_, M>> {
        if self.is_training() {
            return Err(SchedulerErr::State(format!(
                "can't {op} while the model is being trained"
            )));
        }

        self.inner
            .model
            .try_borrow_mut()
            .map_err(|_| SchedulerErr::State(format!("can't {op}, the model is already in use")))
    }

    /// Takes the model for a training session.
    pub(crate) fn lease(&self) -> Result<Lease<M>> {
        if self.inner.leased.replace(true) {
            return Err(SchedulerErr::State(
                "the model is already owned by a running session".into(),
            ));
        }

        debug!("model leased to a training session");
        Ok(Lease {
            inner: Rc::clone(&self.inner),
        })
    }
}

/// Exclusive ownership of a model by a running session, released on drop.
pub(crate) struct Lease<M> {
    inner: Rc<Inner<M>>,
}

impl<M> Lease<M> {
    /// Borrows the model for one step.
    pub fn model(&self) -> Result<RefMut<'_, M>> {
        self.inner
            .model
            .try_borrow_mut()
            .map_err(|_| SchedulerErr::State("the model is already in use".into()))
    }
}

impl<M> Drop for Lease<M> {
    fn drop(&mut self) {
        self.inner.leased.set(false);
        debug!("model lease released");
    }
}
