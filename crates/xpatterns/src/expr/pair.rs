use super::{ExprRef, OperandList};

/// Operand holder for binary nodes. Order is significant.
#[derive(Debug, Clone)]
pub struct PairContainer {
    operands: [ExprRef; 2],
}

impl PairContainer {
    pub fn new(operand1: ExprRef, operand2: ExprRef) -> Self {
        Self {
            operands: [operand1, operand2],
        }
    }

    /// Panics unless `operands` holds exactly two expressions.
    pub fn from_list(operands: OperandList) -> Self {
        assert_eq!(operands.len(), 2, "a binary expression takes two operands");
        let mut ops = operands.into_iter();
        match (ops.next(), ops.next()) {
            (Some(operand1), Some(operand2)) => Self::new(operand1, operand2),
            _ => unreachable!(),
        }
    }

    pub fn operand1(&self) -> &ExprRef {
        &self.operands[0]
    }

    pub fn operand2(&self) -> &ExprRef {
        &self.operands[1]
    }

    pub fn operands(&self) -> &[ExprRef] {
        &self.operands
    }
}
