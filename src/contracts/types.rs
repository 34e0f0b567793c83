// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;

// Plaintext ERC20 with an open mint, used as the underlying asset
abigen!(
    MintableErc20,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
        function mint(address to, uint256 amount) external
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#
);

// Confidential wrapper around a MintableErc20
abigen!(
    ConfidentialToken,
    r#"[
        function confidentialBalanceOf(address account) external view returns (bytes32)
        function wrap(address to, uint256 amount) external
        function unwrap(address from, address to, bytes32 encryptedAmount, bytes inputProof) external
    ]"#
);
