type EchoFieldInnerType = u16;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Identifier(pub EchoFieldInnerType);

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct SequenceNumber(pub EchoFieldInnerType);

impl Identifier {
    pub(crate) fn random() -> Self {
        Identifier(rand::random())
    }
}

impl SequenceNumber {
    pub(crate) fn random() -> Self {
        SequenceNumber(rand::random())
    }
}

impl From<Identifier> for EchoFieldInnerType {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl From<EchoFieldInnerType> for Identifier {
    fn from(value: EchoFieldInnerType) -> Self {
        Identifier(value)
    }
}

impl From<SequenceNumber> for EchoFieldInnerType {
    fn from(value: SequenceNumber) -> Self {
        value.0
    }
}

impl From<EchoFieldInnerType> for SequenceNumber {
    fn from(value: EchoFieldInnerType) -> Self {
        SequenceNumber(value)
    }
}
