// src/vendas/mod.rs

// Declara o submódulo que contém as definições das structs de vendas
pub mod vendas_structs;
// Declara o submódulo com o contrato de armazenamento e a implementação PostgreSQL
pub mod vendas_store;
// Declara o submódulo com o armazenamento em memória usado nos testes
#[cfg(test)]
pub mod vendas_store_mem;
// Declara o submódulo com o caixa, que valida o carrinho e registra a venda
pub mod vendas_caixa;
// Declara o submódulo que contém as funções de rota relacionadas a vendas
pub mod vendas_router;
