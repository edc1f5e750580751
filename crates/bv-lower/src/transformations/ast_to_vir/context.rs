//! Per-procedure lowering state: the command buffer, declared locals, the
//! region arena with its phase stack and the operand stack.

use std::collections::HashSet;

use bv_core::ast::{NodeId, Symbol, TypeRef};
use bv_core::vir::{self, Cmd, Name, VarDecl, VirTy};
use bv_core::Result;
use indexmap::IndexMap;

use crate::queries::LabelScopes;
use crate::{lower_bail, lower_ensure};

/// Integer resume tag shared by every region of a procedure.
pub const LABEL_VAR: &str = "$label";
/// Return slot of procedures with a non-void result.
pub const RESULT_VAR: &str = "$result";
/// Label value for a region left by normal completion.
pub const NORMAL: i64 = -1;
/// Label value for a region left while an exception propagates.
pub const PROPAGATING: i64 = -2;

pub type RegionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InTry,
    InCatch,
    InFinally,
}

/// A jump leaving a region through its `finally`: the value stored in the
/// label variable and where the dispatch after the `finally` resumes.
#[derive(Debug, Clone, PartialEq)]
pub struct EscapingEdge {
    pub id: i64,
    pub resume: Name,
}

/// One `try` statement being lowered. Labels are allocated on first use and
/// never reused.
#[derive(Debug, Clone)]
pub struct Region {
    pub node: NodeId,
    pub catch_types: Vec<Option<TypeRef>>,
    catch_label: Option<Name>,
    finally_label: Option<Name>,
    continuation_label: Option<Name>,
    exception_local: Option<Name>,
    escapes: Vec<EscapingEdge>,
}

impl Region {
    fn new(node: NodeId, catch_types: Vec<Option<TypeRef>>) -> Self {
        Self {
            node,
            catch_types,
            catch_label: None,
            finally_label: None,
            continuation_label: None,
            exception_local: None,
            escapes: Vec::new(),
        }
    }
}

fn lazy_label(slot: &mut Option<Name>, make: impl FnOnce() -> String) -> Name {
    slot.get_or_insert_with(|| Name::new(make())).clone()
}

pub struct LowerCx {
    cmds: Vec<Cmd>,
    params: HashSet<Name>,
    locals: IndexMap<Name, VirTy>,
    regions: Vec<Region>,
    stack: Vec<(RegionId, Phase)>,
    scopes: LabelScopes,
    operands: Vec<vir::Expr>,
    next_temp: usize,
    return_var: Option<Name>,
}

impl LowerCx {
    pub fn new(scopes: LabelScopes) -> Self {
        Self {
            cmds: Vec::new(),
            params: HashSet::new(),
            locals: IndexMap::new(),
            regions: Vec::new(),
            stack: Vec::new(),
            scopes,
            operands: Vec::new(),
            next_temp: 0,
            return_var: None,
        }
    }

    pub fn bind_param(&mut self, name: impl Into<Name>) {
        self.params.insert(name.into());
    }

    pub fn set_return_var(&mut self, name: impl Into<Name>) {
        let name = name.into();
        self.params.insert(name.clone());
        self.return_var = Some(name);
    }

    pub fn return_var(&self) -> Option<&Name> {
        self.return_var.as_ref()
    }

    pub fn emit(&mut self, cmd: Cmd) {
        self.cmds.push(cmd);
    }

    pub fn emit_all(&mut self, cmds: impl IntoIterator<Item = Cmd>) {
        self.cmds.extend(cmds);
    }

    pub fn emit_label(&mut self, label: Name) {
        self.cmds.push(Cmd::Label(label));
    }

    /// Run `f` against an empty command buffer and hand back what it emitted.
    pub fn buffered<F>(&mut self, f: F) -> Result<Vec<Cmd>>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let outer = std::mem::take(&mut self.cmds);
        let result = f(self);
        let inner = std::mem::replace(&mut self.cmds, outer);
        result.map(|()| inner)
    }

    /// Declare a source-level local. Parameters and already declared names are left alone.
    pub fn declare_local(&mut self, name: &Symbol, ty: VirTy) -> Name {
        let name = Name::new(name.as_str());
        if !self.params.contains(&name) {
            self.locals.entry(name.clone()).or_insert(ty);
        }
        name
    }

    /// A scratch local no source name can collide with.
    pub fn fresh_local(&mut self, prefix: &str, ty: VirTy) -> Name {
        let name = Name::new(format!("${}{}", prefix, self.next_temp));
        self.next_temp += 1;
        self.locals.insert(name.clone(), ty);
        name
    }

    pub fn label_var(&mut self) -> Name {
        let name = Name::new(LABEL_VAR);
        self.locals.entry(name.clone()).or_insert(VirTy::Int);
        name
    }

    pub fn push_operand(&mut self, value: vir::Expr) {
        self.operands.push(value);
    }

    pub fn pop_operand(&mut self) -> Result<vir::Expr> {
        match self.operands.pop() {
            Some(value) => Ok(value),
            None => lower_bail!("pop from an empty operand stack"),
        }
    }

    pub fn label_scope(&self, label: &Symbol) -> Option<Option<NodeId>> {
        self.scopes.innermost_try(label)
    }

    pub fn enter_region(&mut self, node: NodeId, catch_types: Vec<Option<TypeRef>>) -> RegionId {
        self.regions.push(Region::new(node, catch_types));
        self.regions.len() - 1
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id]
    }

    pub fn push_phase(&mut self, id: RegionId, phase: Phase) {
        tracing::trace!("region {} enters {:?}", id, phase);
        self.stack.push((id, phase));
    }

    pub fn pop_phase(&mut self, id: RegionId, phase: Phase) -> Result<()> {
        let top = self.stack.pop();
        lower_ensure!(
            top == Some((id, phase)),
            format!(
                "region stack out of balance: expected ({}, {:?}), found {:?}",
                id, phase, top
            )
        );
        Ok(())
    }

    pub fn top(&self) -> Option<(RegionId, Phase)> {
        self.stack.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack_entry(&self, index: usize) -> (RegionId, Phase) {
        self.stack[index]
    }

    /// Position on the stack of the region lowering the `try` statement `node`.
    pub fn stack_position(&self, node: NodeId) -> Option<usize> {
        self.stack
            .iter()
            .position(|(id, _)| self.regions[*id].node == node)
    }

    /// Nearest enclosing region whose catch clauses are being lowered.
    pub fn innermost_catch(&self) -> Option<RegionId> {
        self.stack
            .iter()
            .rev()
            .find(|(_, phase)| *phase == Phase::InCatch)
            .map(|(id, _)| *id)
    }

    pub fn catch_label(&mut self, id: RegionId) -> Name {
        lazy_label(&mut self.regions[id].catch_label, || format!("$catch{}", id))
    }

    pub fn finally_label(&mut self, id: RegionId) -> Name {
        lazy_label(&mut self.regions[id].finally_label, || format!("$finally{}", id))
    }

    pub fn continuation_label(&mut self, id: RegionId) -> Name {
        lazy_label(&mut self.regions[id].continuation_label, || {
            format!("$continuation{}", id)
        })
    }

    /// The local holding the exception caught by region `id`.
    pub fn exception_local(&mut self, id: RegionId) -> Name {
        if let Some(name) = &self.regions[id].exception_local {
            return name.clone();
        }
        let name = Name::new(format!("$localExc{}", id));
        self.locals.insert(name.clone(), VirTy::Ref);
        self.regions[id].exception_local = Some(name.clone());
        name
    }

    pub fn add_escaping_edge(&mut self, id: RegionId) -> EscapingEdge {
        let region = &mut self.regions[id];
        let edge_id = region.escapes.len() as i64;
        let edge = EscapingEdge {
            id: edge_id,
            resume: Name::new(format!("$escape{}_{}", id, edge_id)),
        };
        region.escapes.push(edge.clone());
        edge
    }

    pub fn escaping_edges(&self, id: RegionId) -> &[EscapingEdge] {
        &self.regions[id].escapes
    }

    /// Locals in declaration order and the top-level command list.
    pub fn finish(self) -> Result<(Vec<VarDecl>, Vec<Cmd>)> {
        lower_ensure!(
            self.stack.is_empty(),
            format!("{} regions still open at the end of the body", self.stack.len())
        );
        let locals = self
            .locals
            .into_iter()
            .map(|(name, ty)| VarDecl::new(name, ty))
            .collect();
        Ok((locals, self.cmds))
    }
}
