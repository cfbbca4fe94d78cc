// src/contracts.rs
//! Human-readable ABI bindings for the contracts an operation touches.
use ethers::prelude::abigen;

abigen!(
    Erc20,
    r#"[
        function decimals() external view returns (uint8)
        function transfer(address to, uint256 amount) external returns (bool)
    ]"#
);

abigen!(
    CreateCall,
    r#"[
        function performCreate2(uint256 value, bytes deploymentData, bytes32 salt) external returns (address newContract)
    ]"#
);

abigen!(
    MinimalTokenFactory,
    r#"[
        function createMinimal(string name, string symbol, address owner, address minter, uint256 initMint, uint256 maxSupply) external returns (address token)
    ]"#
);

abigen!(
    SimpleAccountContract,
    r#"[
        function execute(address dest, uint256 value, bytes func) external
        function executeBatch(address[] dest, bytes[] func) external
    ]"#
);

abigen!(
    SimpleAccountFactory,
    r#"[
        function createAccount(address owner, uint256 salt) external returns (address ret)
    ]"#
);

abigen!(
    EntryPoint,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
    ]"#
);
